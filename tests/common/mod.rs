#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use orderflow_api::{
    auth::{USER_ID_HEADER, USER_ROLE_HEADER},
    build_router,
    config::AppConfig,
    db,
    entities::{
        order::{self, OrderStatus},
        product::{self, ProductStatus},
        Order, Product,
    },
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    services::payments::{PaymentGateway, PaymentOutcome},
    sessions::{SessionStore, SESSION_HEADER},
    AppState,
};

/// Test harness: application state backed by an in-memory SQLite database
/// and a deterministic payment gateway.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// App with a gateway that always approves.
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(StaticGateway::approving())).await
    }

    pub async fn with_gateway(gateway: Arc<dyn PaymentGateway>) -> Self {
        let mut cfg = AppConfig::new("sqlite::memory:", "test");
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        // Keep the payment deadline short so timeout tests stay fast.
        cfg.payment_timeout_secs = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let sessions = Arc::new(SessionStore::new());
        let config = Arc::new(cfg);
        let services = AppServices::new(
            db.clone(),
            sessions.clone(),
            Arc::new(event_sender.clone()),
            gateway,
            config.clone(),
        );

        let state = AppState {
            db,
            config,
            event_sender,
            sessions,
            services,
        };
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    /// Sends a request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, String)],
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, value.as_str());
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level")
    }

    /// Seeds an active product and returns its model.
    pub async fn seed_product(
        &self,
        name: &str,
        sku: &str,
        price_cents: i64,
        qty: i32,
    ) -> product::Model {
        self.seed_product_with_status(name, sku, price_cents, qty, ProductStatus::Active)
            .await
    }

    pub async fn seed_product_with_status(
        &self,
        name: &str,
        sku: &str,
        price_cents: i64,
        qty: i32,
        status: ProductStatus,
    ) -> product::Model {
        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(sku.to_string()),
            description: Set(None),
            price_cents: Set(price_cents),
            qty: Set(qty),
            status: Set(status),
            image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to seed product")
    }

    /// Sets a product's price directly (simulating catalog price drift).
    pub async fn set_product_price(&self, product_id: Uuid, price_cents: i64) {
        let product = Product::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("query should succeed")
            .expect("product should exist");
        let mut active: product::ActiveModel = product.into();
        active.price_cents = Set(price_cents);
        active.update(&*self.state.db).await.expect("update price");
    }

    pub async fn product_qty(&self, product_id: Uuid) -> i32 {
        Product::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("query should succeed")
            .expect("product should exist")
            .qty
    }

    pub async fn order(&self, order_id: Uuid) -> order::Model {
        Order::find_by_id(order_id)
            .one(&*self.state.db)
            .await
            .expect("query should succeed")
            .expect("order should exist")
    }

    pub async fn order_status(&self, order_id: Uuid) -> OrderStatus {
        self.order(order_id).await.status
    }

    pub async fn order_count(&self) -> u64 {
        use sea_orm::PaginatorTrait;
        Order::find()
            .count(&*self.state.db)
            .await
            .expect("count should succeed")
    }

    /// Reserves an order directly through the service layer, leaving it in
    /// the `pending` state with stock already deducted (the state an order
    /// is in while payment is in flight).
    pub async fn seed_pending_order(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        qty: i32,
    ) -> order::Model {
        use sea_orm::TransactionTrait;

        let session = format!("seed-{}", Uuid::new_v4());
        self.state
            .sessions
            .with_cart(&session, |cart| cart.add(product_id, qty));

        let summary = self
            .state
            .services
            .cart
            .summary(&session)
            .await
            .expect("summary should succeed");

        let txn = self.state.db.begin().await.expect("begin txn");
        let order = self
            .state
            .services
            .orders
            .create_order(&txn, user_id, &summary)
            .await
            .expect("create order");
        self.state
            .services
            .inventory
            .deduct_stock(&txn, &summary.items)
            .await
            .expect("deduct stock");
        txn.commit().await.expect("commit txn");

        self.state.sessions.clear_cart(&session);
        order
    }
}

/// Headers for an anonymous request carrying only a session token.
pub fn session_headers(session: &str) -> Vec<(&'static str, String)> {
    vec![(SESSION_HEADER, session.to_string())]
}

/// Headers for a customer request.
pub fn customer_headers(session: &str, user_id: Uuid) -> Vec<(&'static str, String)> {
    vec![
        (SESSION_HEADER, session.to_string()),
        (USER_ID_HEADER, user_id.to_string()),
        (USER_ROLE_HEADER, "customer".to_string()),
    ]
}

/// Headers for an admin request.
pub fn admin_headers(user_id: Uuid) -> Vec<(&'static str, String)> {
    vec![
        (USER_ID_HEADER, user_id.to_string()),
        (USER_ROLE_HEADER, "admin".to_string()),
    ]
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

/// Gateway resolving instantly to a fixed outcome.
pub struct StaticGateway {
    outcome: PaymentOutcome,
}

impl StaticGateway {
    pub fn approving() -> Self {
        Self {
            outcome: PaymentOutcome::Approved,
        }
    }

    pub fn declining() -> Self {
        Self {
            outcome: PaymentOutcome::Declined,
        }
    }
}

#[async_trait]
impl PaymentGateway for StaticGateway {
    async fn process_payment(
        &self,
        _amount_cents: i64,
        _user_id: Uuid,
    ) -> Result<PaymentOutcome, ServiceError> {
        Ok(self.outcome)
    }
}

/// Gateway that approves only after a fixed delay; paired with a short
/// configured deadline it exercises the timeout-compensation path.
pub struct SlowGateway {
    pub delay: Duration,
}

#[async_trait]
impl PaymentGateway for SlowGateway {
    async fn process_payment(
        &self,
        _amount_cents: i64,
        _user_id: Uuid,
    ) -> Result<PaymentOutcome, ServiceError> {
        tokio::time::sleep(self.delay).await;
        Ok(PaymentOutcome::Approved)
    }
}
