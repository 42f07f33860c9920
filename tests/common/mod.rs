//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::util::ServiceExt;

use coop_savings::domain::{FixedClock, NumberGenerator, Role, SharedClock, Staff};
use coop_savings::store::{InMemoryStore, SharedStore};
use coop_savings::{api, Services};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const MANAGER_KEY: &str = "test-manager-key";
pub const ASSISTANT_KEY: &str = "test-assistant-key";
pub const DISABLED_KEY: &str = "test-disabled-key";

pub struct TestApp {
    pub router: Router,
    pub services: Services,
    pub clock: Arc<FixedClock>,
}

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
}

/// Services over the in-memory store, pinned to [`test_date`]
pub fn in_memory_services() -> (Services, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::at_date(test_date()));
    let shared: SharedClock = clock.clone();
    let store: SharedStore = Arc::new(InMemoryStore::new());
    let numbers = Arc::new(NumberGenerator::seeded(shared.clone(), 7));
    (Services::new(store, shared, numbers), clock)
}

/// Router over the in-memory store with one staff key per role
pub async fn spawn_app() -> TestApp {
    let (services, clock) = in_memory_services();

    for (username, role, key) in [
        ("admin", Role::Admin, ADMIN_KEY),
        ("manager", Role::Manager, MANAGER_KEY),
        ("assistant", Role::Assistant, ASSISTANT_KEY),
    ] {
        services
            .store
            .upsert_staff(&Staff::new(username, role, key))
            .await
            .unwrap();
    }
    let mut disabled = Staff::new("former", Role::Admin, DISABLED_KEY);
    disabled.is_active = false;
    services.store.upsert_staff(&disabled).await.unwrap();

    TestApp {
        router: api::app(services.clone()),
        services,
        clock,
    }
}

/// Send one request and decode the JSON body (`Value::Null` when empty)
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, json)
}

/// Decimal fields are serialized as strings
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected a decimal string, got {value}"))
        .parse()
        .unwrap()
}

/// Connect to DATABASE_URL, apply the schema and empty every table
pub async fn setup_test_db() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    coop_savings::db::run_migrations(&pool)
        .await
        .expect("Failed to apply schema");

    sqlx::query(
        "TRUNCATE TABLE transactions, saving_accounts, shares, members, staff_api_keys RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .expect("Failed to clean up DB");

    pool
}
