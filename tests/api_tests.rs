use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use storefront_rs::models::{Cart, Product};
use storefront_rs::Config;

mod common;
use common::*;

async fn body(response: reqwest::Response) -> Value {
    response.json().await.expect("Failed to parse response")
}

async fn create_cart(env: &TestEnvironment) -> Uuid {
    let response = env
        .client
        .post(env.url("/api/carts"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 201);

    let cart: Cart = serde_json::from_value(body(response).await["cart"].clone()).unwrap();
    assert!(cart.is_empty());
    cart.id
}

#[tokio::test]
async fn test_health_endpoint() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url("/health/status"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_product_admin_lifecycle() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/api/admin/products"))
        .json(&product_request("Mate Gourd", dec!(12.50), 10, "kitchen"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 201);
    let created: Product = serde_json::from_value(body(response).await["product"].clone()).unwrap();
    assert_eq!(created.title, "Mate Gourd");

    let response = env
        .client
        .put(env.url(&format!("/api/admin/products/{}", created.id)))
        .json(&json!({"price": "14.00", "stock": 3}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(env.url(&format!("/api/products/{}", created.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let fetched: Product = serde_json::from_value(body(response).await["product"].clone()).unwrap();
    assert_eq!(fetched.price, dec!(14.00));
    assert_eq!(fetched.stock, 3);
    assert_eq!(fetched.title, "Mate Gourd");

    let response = env
        .client
        .delete(env.url(&format!("/api/admin/products/{}", created.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(env.url(&format!("/api/products/{}", created.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);
    let error = body(response).await;
    assert_eq!(error["status"], "error");
    assert!(error["timestamp"].is_string());
}

#[tokio::test]
async fn test_create_product_with_invalid_data() {
    let env = TestEnvironment::new().await;

    let mut request = product_request("", dec!(5.00), 1, "grocery");
    request.title = "   ".to_string();

    let response = env
        .client
        .post(env.url("/api/admin/products"))
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_listing_filters_by_price_and_category() {
    let env = TestEnvironment::new().await;
    for (title, price, category) in [
        ("Cheap Tea", dec!(5.00), "grocery"),
        ("Low Bound", dec!(10.00), "grocery"),
        ("Mid Range", dec!(15.00), "grocery"),
        ("High Bound", dec!(20.00), "grocery"),
        ("Too Dear", dec!(25.00), "grocery"),
        ("Kettle", dec!(15.00), "kitchen"),
    ] {
        env.app
            .add_product(product_request(title, price, 5, category))
            .await;
    }

    let response = env
        .client
        .get(env.url("/api/products?minPrice=10&maxPrice=20&query=grocery&sort=asc"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let page = body(response).await;
    assert_eq!(page["status"], "success");
    assert_eq!(page["payload"]["total_items"], 3);

    let items: Vec<Product> =
        serde_json::from_value(page["payload"]["items"].clone()).unwrap();
    let prices: Vec<_> = items.iter().map(|p| p.price).collect();
    assert_eq!(prices, vec![dec!(10.00), dec!(15.00), dec!(20.00)]);
    assert!(items.iter().all(|p| p.category == "grocery"));
}

#[tokio::test]
async fn test_listing_empty_result_is_not_an_error() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url("/api/products?minPrice=1000"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    let page = body(response).await;
    assert_eq!(page["payload"]["items"], json!([]));
    assert_eq!(page["payload"]["total_pages"], 1);
    assert_eq!(page["payload"]["has_next_page"], false);
}

#[tokio::test]
async fn test_listing_rejects_inverted_price_range() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url("/api/products?minPrice=20&maxPrice=10"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_listing_pagination() {
    let env = TestEnvironment::new().await;
    for i in 0..5 {
        env.app
            .add_product(product_request(
                &format!("Item {}", i),
                rust_decimal::Decimal::from(i + 1),
                5,
                "misc",
            ))
            .await;
    }

    let response = env
        .client
        .get(env.url("/api/products?limit=2&page=2&sort=desc"))
        .send()
        .await
        .expect("Failed to send request");
    let page = body(response).await["payload"].clone();

    assert_eq!(page["total_pages"], 3);
    assert_eq!(page["has_prev_page"], true);
    assert_eq!(page["prev_page"], 1);
    assert_eq!(page["has_next_page"], true);
    assert_eq!(page["next_page"], 3);
    let items: Vec<Product> = serde_json::from_value(page["items"].clone()).unwrap();
    assert_eq!(items[0].price, dec!(3));

    let response = env
        .client
        .get(env.url("/api/products?limit=2&page=9"))
        .send()
        .await
        .expect("Failed to send request");
    let page = body(response).await["payload"].clone();

    assert_eq!(page["items"], json!([]));
    assert_eq!(page["has_next_page"], false);
    assert!(page["next_page"].is_null());
}

#[tokio::test]
async fn test_cart_add_merge_and_stock_limit() {
    let env = TestEnvironment::new().await;
    let product = env
        .app
        .add_product(product_request("Alfajores", dec!(2.50), 5, "grocery"))
        .await;
    let cart_id = create_cart(&env).await;
    let line_url = env.url(&format!("/api/carts/{}/products/{}", cart_id, product.id));

    let response = env
        .client
        .post(&line_url)
        .json(&json!({"quantity": 3}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .post(&line_url)
        .json(&json!({"quantity": "2"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let cart: Cart = serde_json::from_value(body(response).await["cart"].clone()).unwrap();
    assert_eq!(cart.products.len(), 1);
    assert_eq!(cart.quantity_of(product.id), 5);

    let response = env
        .client
        .post(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 409);

    let response = env
        .client
        .get(env.url(&format!("/api/carts/{}", cart_id)))
        .send()
        .await
        .expect("Failed to send request");
    let resolved = body(response).await["cart"].clone();
    assert_eq!(resolved["products"][0]["quantity"], 5);
    assert_eq!(resolved["total_items"], 5);
}

#[tokio::test]
async fn test_cart_add_without_body_adds_one_unit() {
    let env = TestEnvironment::new().await;
    let product = env
        .app
        .add_product(product_request("Yerba", dec!(6.40), 10, "grocery"))
        .await;
    let cart_id = create_cart(&env).await;

    let response = env
        .client
        .post(env.url(&format!("/api/carts/{}/products/{}", cart_id, product.id)))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    let cart: Cart = serde_json::from_value(body(response).await["cart"].clone()).unwrap();
    assert_eq!(cart.quantity_of(product.id), 1);
}

#[tokio::test]
async fn test_cart_rejects_invalid_quantities() {
    let env = TestEnvironment::new().await;
    let product = env
        .app
        .add_product(product_request("Bombilla", dec!(7.00), 10, "kitchen"))
        .await;
    let cart_id = create_cart(&env).await;
    let line_url = env.url(&format!("/api/carts/{}/products/{}", cart_id, product.id));

    for quantity in [json!(0), json!(-1), json!(1.5), json!("two"), json!([2]), json!(true)] {
        let response = env
            .client
            .post(&line_url)
            .json(&json!({ "quantity": quantity }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(
            response.status().as_u16(),
            400,
            "quantity {} should be rejected",
            quantity
        );
    }
}

#[tokio::test]
async fn test_cart_remove_set_replace_and_empty() {
    let env = TestEnvironment::new().await;
    let first = env
        .app
        .add_product(product_request("Poncho", dec!(89.00), 4, "apparel"))
        .await;
    let second = env
        .app
        .add_product(product_request("Boots", dec!(120.00), 2, "apparel"))
        .await;
    let cart_id = create_cart(&env).await;
    let cart_url = env.url(&format!("/api/carts/{}", cart_id));

    let response = env
        .client
        .put(&cart_url)
        .json(&json!({"products": [
            {"product": first.id, "quantity": 2},
            {"product": second.id.to_string(), "quantity": "1"},
        ]}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .put(env.url(&format!("/api/carts/{}/products/{}", cart_id, first.id)))
        .json(&json!({"quantity": 4}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .put(env.url(&format!("/api/carts/{}/products/{}", cart_id, second.id)))
        .json(&json!({"quantity": 3}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 409);

    let response = env
        .client
        .delete(env.url(&format!("/api/carts/{}/products/{}", cart_id, second.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(&cart_url)
        .send()
        .await
        .expect("Failed to send request");
    let resolved = body(response).await["cart"].clone();
    let lines = resolved["products"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["product_id"], first.id.to_string());
    assert_eq!(lines[0]["quantity"], 4);

    let response = env
        .client
        .delete(env.url(&format!("/api/carts/{}/products/{}", cart_id, second.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    let response = env
        .client
        .delete(&cart_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(&cart_url)
        .send()
        .await
        .expect("Failed to send request");
    let resolved = body(response).await["cart"].clone();
    assert_eq!(resolved["products"], json!([]));
    assert_eq!(resolved["total_items"], 0);
}

#[tokio::test]
async fn test_replace_rejects_duplicates_without_persisting() {
    let env = TestEnvironment::new().await;
    let product = env
        .app
        .add_product(product_request("Thermos", dec!(34.90), 10, "kitchen"))
        .await;
    let cart_id = create_cart(&env).await;

    let response = env
        .client
        .put(env.url(&format!("/api/carts/{}", cart_id)))
        .json(&json!({"products": [
            {"product": product.id, "quantity": 1},
            {"product": product.id, "quantity": 2},
        ]}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);

    let response = env
        .client
        .get(env.url(&format!("/api/carts/{}", cart_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(body(response).await["cart"]["products"], json!([]));
}

#[tokio::test]
async fn test_cart_with_deleted_product_still_resolves() {
    let env = TestEnvironment::new().await;
    let kept = env
        .app
        .add_product(product_request("Kept", dec!(1.00), 10, "misc"))
        .await;
    let deleted = env
        .app
        .add_product(product_request("Gone", dec!(2.00), 10, "misc"))
        .await;

    let mut cart = Cart::new();
    cart.add_line(&kept, 2).unwrap();
    cart.add_line(&deleted, 1).unwrap();
    let cart = env.app.add_cart(cart).await;

    let response = env
        .client
        .delete(env.url(&format!("/api/admin/products/{}", deleted.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(env.url(&format!("/api/carts/{}", cart.id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let resolved = body(response).await["cart"].clone();
    assert_eq!(resolved["products"][0]["product"]["title"], "Kept");
    assert!(resolved["products"][1]["product"].is_null());
    assert_eq!(resolved["products"][1]["product_id"], deleted.id.to_string());
}

#[tokio::test]
async fn test_unknown_and_malformed_cart_ids() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url(&format!("/api/carts/{}", Uuid::new_v4())))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    let response = env
        .client
        .get(env.url("/api/carts/not-a-uuid"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_default_cart() {
    let cart_id = Uuid::new_v4();
    let mut config = Config::default();
    config.store.default_cart_id = Some(cart_id.to_string());

    let env = TestEnvironment::with_config(config).await;
    let mut cart = Cart::new();
    cart.id = cart_id;
    env.app.add_cart(cart).await;

    let response = env
        .client
        .get(env.url("/api/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(body(response).await["cart"]["id"], cart_id.to_string());

    let response = env
        .client
        .get(env.url("/api/products"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(body(response).await["cart_id"], cart_id.to_string());
}

#[tokio::test]
async fn test_default_cart_not_configured() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url("/api/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    let response = env
        .client
        .get(env.url("/api/products"))
        .send()
        .await
        .expect("Failed to send request");
    assert!(body(response).await.get("cart_id").is_none());
}

#[tokio::test]
async fn test_seed_populates_catalog() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/api/admin/seed"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let seeded = body(response).await["products_created"].as_u64().unwrap();
    assert!(seeded > 0);

    let response = env
        .client
        .get(env.url("/api/products?limit=100"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(body(response).await["payload"]["total_items"], seeded);
}

#[tokio::test]
async fn test_metrics_endpoint_reports_traffic() {
    let env = TestEnvironment::new().await;

    env.client
        .get(env.url("/api/products"))
        .send()
        .await
        .expect("Failed to send request");

    let response = env
        .client
        .get(env.url("/metrics"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let text = response.text().await.unwrap();
    assert!(text.contains("endpoint=\"/api/products\""));
    assert!(text.contains("catalog_operations_total"));
}

#[tokio::test]
async fn test_listing_treats_blank_filters_as_absent() {
    let env = TestEnvironment::new().await;
    for (title, price) in [("Budget", dec!(8.00)), ("Premium", dec!(40.00))] {
        env.app
            .add_product(product_request(title, price, 5, "grocery"))
            .await;
    }

    let response = env
        .client
        .get(env.url("/api/products?minPrice=&maxPrice=20"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let page = body(response).await;
    assert_eq!(page["payload"]["total_items"], 1);
    assert_eq!(page["payload"]["items"][0]["title"], "Budget");

    let response = env
        .client
        .get(env.url("/api/products?limit=&page=&query=&sort=&minPrice=&maxPrice="))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let page = body(response).await;
    assert_eq!(page["payload"]["total_items"], 2);
    assert_eq!(page["payload"]["page"], 1);
    assert_eq!(page["payload"]["limit"], 10);

    let response = env
        .client
        .get(env.url("/api/products?maxPrice=twenty"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn test_default_cart_mutations() {
    let cart_id = Uuid::new_v4();
    let mut config = Config::default();
    config.store.default_cart_id = Some(cart_id.to_string());

    let env = TestEnvironment::with_config(config).await;
    let mut cart = Cart::new();
    cart.id = cart_id;
    env.app.add_cart(cart).await;
    let product = env
        .app
        .add_product(product_request("Empanada", dec!(1.80), 12, "grocery"))
        .await;
    let line_url = env.url(&format!("/api/cart/products/{}", product.id));

    let response = env
        .client
        .post(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .post(&line_url)
        .json(&json!({"quantity": "4"}))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let updated: Cart = serde_json::from_value(body(response).await["cart"].clone()).unwrap();
    assert_eq!(updated.id, cart_id);
    assert_eq!(updated.quantity_of(product.id), 5);

    let response = env
        .client
        .delete(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let updated: Cart = serde_json::from_value(body(response).await["cart"].clone()).unwrap();
    assert!(!updated.contains(product.id));

    env.client
        .post(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    let response = env
        .client
        .delete(env.url("/api/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);

    let response = env
        .client
        .get(env.url(&format!("/api/carts/{}", cart_id)))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(body(response).await["cart"]["products"], json!([]));
}

#[tokio::test]
async fn test_default_cart_mutations_without_configuration() {
    let env = TestEnvironment::new().await;
    let line_url = env.url(&format!("/api/cart/products/{}", Uuid::new_v4()));

    let response = env
        .client
        .post(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    let response = env
        .client
        .delete(&line_url)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);

    let response = env
        .client
        .delete(env.url("/api/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 404);
}
