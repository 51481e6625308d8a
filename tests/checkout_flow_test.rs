//! Integration tests for the checkout pipeline:
//! cart -> validate -> reserve -> pay -> finalize/compensate.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::{body_json, customer_headers, session_headers, SlowGateway, StaticGateway, TestApp};
use serde_json::json;
use uuid::Uuid;

async fn fill_cart(app: &TestApp, session: &str, product_id: Uuid, qty: i32) {
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/cart/items/{}", product_id),
            &session_headers(session),
            Some(json!({ "qty": qty })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn successful_checkout_snapshots_order_and_deducts_stock() {
    // Scenario: cart = {A: 2}, A.price_cents = 500, A.qty = 10.
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;

    fill_cart(&app, "s1", product.id, 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total_cents"], 1000);
    assert!(body["delivery_estimate"].as_str().is_some());

    let order_id = Uuid::parse_str(body["order_id"].as_str().unwrap()).unwrap();
    let order = app.order(order_id).await;
    assert_eq!(order.total_cents, 1000);
    assert_eq!(order.user_id, user);

    // Stock decreased by exactly the purchased quantity.
    assert_eq!(app.product_qty(product.id).await, 8);

    // The cart was destroyed on success.
    let response = app
        .request(Method::GET, "/api/v1/cart", &session_headers("s1"), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["item_count"], 0);
}

#[tokio::test]
async fn order_total_matches_item_subtotals() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let lamp = app.seed_product("Lamp", "LAMP-1", 2500, 10).await;
    let fan = app.seed_product("Fan", "FAN-1", 1999, 10).await;

    fill_cart(&app, "s1", lamp.id, 3).await;
    fill_cart(&app, "s1", fan.id, 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    let order_id = Uuid::parse_str(body["order_id"].as_str().unwrap()).unwrap();
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            &customer_headers("s1", user),
            None,
        )
        .await;
    let order = body_json(response).await;

    let items = order["items"].as_array().unwrap();
    let item_sum: i64 = items
        .iter()
        .map(|item| item["subtotal_cents"].as_i64().unwrap())
        .sum();
    assert_eq!(order["total_cents"].as_i64().unwrap(), item_sum);
    assert_eq!(item_sum, 3 * 2500 + 2 * 1999);

    for item in items {
        assert_eq!(
            item["subtotal_cents"].as_i64().unwrap(),
            item["unit_price_cents"].as_i64().unwrap() * item["qty"].as_i64().unwrap()
        );
    }
}

#[tokio::test]
async fn insufficient_stock_fails_validation_without_an_order() {
    // Scenario: A.qty = 1, cart = {A: 2}.
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 1).await;

    fill_cart(&app, "s1", product.id, 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("Insufficient stock"));
    assert!(error.contains(&product.id.to_string()));

    // No order was created and stock is untouched.
    assert_eq!(app.order_count().await, 0);
    assert_eq!(app.product_qty(product.id).await, 1);
}

#[tokio::test]
async fn empty_cart_checkout_is_rejected() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Cart is empty.");
    assert_eq!(app.order_count().await, 0);
}

#[tokio::test]
async fn checkout_requires_identity() {
    let app = TestApp::new().await;
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;
    fill_cart(&app, "s1", product.id, 1).await;

    let response = app
        .request(Method::POST, "/api/v1/checkout", &session_headers("s1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn declined_payment_compensates_without_restoring_stock() {
    // Scenario: reservation commits, then the gateway declines. The order
    // flips to canceled and stock stays at the post-deduction level; this
    // asymmetry with user cancellation is deliberate observed behavior.
    let app = TestApp::with_gateway(Arc::new(StaticGateway::declining())).await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;

    fill_cart(&app, "s1", product.id, 2).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Payment declined.");

    // The order exists, compensated to canceled.
    assert_eq!(app.order_count().await, 1);
    use orderflow_api::entities::{order::OrderStatus, Order};
    use sea_orm::EntityTrait;
    let order = Order::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);

    // Stock remains deducted.
    assert_eq!(app.product_qty(product.id).await, 8);

    // The cart survives a failed checkout.
    let response = app
        .request(Method::GET, "/api/v1/cart", &session_headers("s1"), None)
        .await;
    let body = body_json(response).await;
    assert_eq!(body["item_count"], 1);
}

#[tokio::test]
async fn payment_timeout_runs_the_decline_compensation() {
    // The harness sets a 1s payment deadline; this gateway takes 3s.
    let app = TestApp::with_gateway(Arc::new(SlowGateway {
        delay: Duration::from_secs(3),
    }))
    .await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;

    fill_cart(&app, "s1", product.id, 1).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Payment declined.");

    use orderflow_api::entities::{order::OrderStatus, Order};
    use sea_orm::EntityTrait;
    let order = Order::find().one(&*app.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Canceled);
}

#[tokio::test]
async fn order_snapshot_survives_catalog_price_drift() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;

    fill_cart(&app, "s1", product.id, 2).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    let body = body_json(response).await;
    let order_id = Uuid::parse_str(body["order_id"].as_str().unwrap()).unwrap();

    // Catalog price doubles after purchase.
    app.set_product_price(product.id, 1000).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            &customer_headers("s1", user),
            None,
        )
        .await;
    let order = body_json(response).await;
    assert_eq!(order["total_cents"], 1000);
    assert_eq!(order["items"][0]["unit_price_cents"], 500);
    assert_eq!(order["items"][0]["subtotal_cents"], 1000);
}

#[tokio::test]
async fn oversell_is_refused_at_the_reservation_step() {
    // Two sequential deductions against qty 1: the second must fail even
    // though both would have passed a stale validation read.
    let app = TestApp::new().await;
    let product = app.seed_product("Widget", "WID-1", 500, 1).await;

    let session = "race";
    app.state
        .sessions
        .with_cart(session, |cart| cart.add(product.id, 1));
    let summary = app.state.services.cart.summary(session).await.unwrap();

    use sea_orm::TransactionTrait;
    let txn = app.state.db.begin().await.unwrap();
    app.state
        .services
        .inventory
        .deduct_stock(&txn, &summary.items)
        .await
        .unwrap();
    txn.commit().await.unwrap();
    assert_eq!(app.product_qty(product.id).await, 0);

    let txn = app.state.db.begin().await.unwrap();
    let err = app
        .state
        .services
        .inventory
        .deduct_stock(&txn, &summary.items)
        .await
        .unwrap_err();
    drop(txn);

    use assert_matches::assert_matches;
    use orderflow_api::errors::ServiceError;
    assert_matches!(err, ServiceError::InsufficientStock(_));
    assert_eq!(app.product_qty(product.id).await, 0);
}

#[tokio::test]
async fn checkout_review_returns_the_cart_summary() {
    let app = TestApp::new().await;
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;
    fill_cart(&app, "s1", product.id, 2).await;

    let response = app
        .request(Method::GET, "/api/v1/checkout", &session_headers("s1"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["item_count"], 1);
    assert_eq!(body["total_cents"], 1000);
}

#[tokio::test]
async fn product_archived_after_carting_empties_the_checkout() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let product = app.seed_product("Widget", "WID-1", 500, 10).await;
    fill_cart(&app, "s1", product.id, 1).await;

    // The product is archived between carting and checkout; the summary
    // drops it, leaving an empty cart at the pipeline's first gate.
    use orderflow_api::entities::product::{self, ProductStatus};
    use sea_orm::{ActiveModelTrait, EntityTrait, Set};
    let model = product::Entity::find_by_id(product.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut archived: product::ActiveModel = model.into();
    archived.status = Set(ProductStatus::Archived);
    archived.update(&*app.state.db).await.unwrap();

    let response = app
        .request(
            Method::POST,
            "/api/v1/checkout",
            &customer_headers("s1", user),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Cart is empty.");
    assert_eq!(app.order_count().await, 0);
}
