//! SalasTech API Server
//!
//! REST API for the room reservation subsystem.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salastech_auth::middleware::auth_middleware;
use salastech_core::clock::{Calendar, SystemClock};
use salastech_db::Database;
use salastech_scheduler::{SchedulerConfig, SchedulerRunner};

pub mod config;
mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use state::AppState;

/// Start the API server: opens the database, spawns the lifecycle scheduler
/// and serves the HTTP API.
pub async fn start_server(config: config::ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "salastech_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut db = Database::open(&config.db_connection)?;
    db.initialize()?;

    let calendar = Calendar::from_config(config.holidays.as_deref(), config.business_hours.as_deref());
    let state = AppState::with_calendar(db.clone(), config.jwt_secret.clone(), calendar);

    let scheduler_config = SchedulerConfig {
        auto_approve_after: chrono::Duration::hours(config.auto_approve_after_hours),
        archive_after: chrono::Duration::days(config.archive_after_days),
    };
    let scheduler =
        SchedulerRunner::new(db, Arc::new(SystemClock), state.token_store.clone(), scheduler_config);
    let _scheduler_handles = scheduler.spawn();

    let app = create_router(state, &config.cors_origins);

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting SalasTech server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let cors = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins = cors_origins.iter().filter_map(|o| o.parse().ok()).collect::<Vec<_>>();
        CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
    };

    let protected = Router::new()
        .nest("/reservations", routes::reservation_routes())
        .nest("/rooms", routes::room_routes())
        .nest("/departments", routes::department_routes())
        .nest("/reports", routes::report_routes())
        .layer(axum::middleware::from_fn_with_state(state.auth_state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1/auth", routes::auth_routes())
        .nest("/api/v1", protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn test_state() -> AppState {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        AppState::new(db, b"test-secret".to_vec())
    }

    /// The next weekday, non-holiday business slot at least `after_days` out —
    /// keeps the notice/weekday/holiday policy checks satisfied regardless of
    /// when this test actually runs.
    fn business_slot(after_days: i64) -> (String, String) {
        use chrono::Datelike;
        let holidays = [(1, 1), (4, 21), (5, 1), (9, 7), (10, 12), (11, 2), (11, 15), (12, 25)];
        let mut day = (chrono::Utc::now() + chrono::Duration::days(after_days)).date_naive();
        loop {
            let weekday = day.weekday().number_from_monday();
            if weekday <= 5 && !holidays.contains(&(day.month(), day.day())) {
                break;
            }
            day = day.succ_opt().unwrap();
        }
        let start = day.and_hms_opt(14, 0, 0).unwrap().and_utc();
        let end = start + chrono::Duration::hours(1);
        (start.to_rfc3339(), end.to_rfc3339())
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri).header("content-type", "application/json");
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let app = create_router(test_state(), &["*".to_string()]);
        let (status, _) = send(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_reject_missing_token() {
        let app = create_router(test_state(), &["*".to_string()]);
        let (status, _) = send(&app, "GET", "/api/v1/reservations", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    /// End-to-end: register an admin, stand up a department and a room,
    /// then exercise Scenario A (happy booking), B (conflict) and F
    /// (cross-department denial) through the real HTTP surface.
    #[tokio::test]
    async fn reservation_lifecycle_through_http() {
        let app = create_router(test_state(), &["*".to_string()]);

        let (status, admin) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"name":"Ada","surname":"Lovelace","email":"admin@example.com","password":"hunter2pass","role":"ADMIN"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let _ = admin;

        let (status, login) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email":"admin@example.com","password":"hunter2pass"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let admin_token = login["tokens"]["accessToken"].as_str().unwrap().to_string();

        let (status, dept) = send(
            &app,
            "POST",
            "/api/v1/departments",
            Some(&admin_token),
            Some(json!({"name":"Engineering","code":"ENG"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let dept_id = dept["id"].as_str().unwrap().to_string();

        let (status, room) = send(
            &app,
            "POST",
            "/api/v1/rooms",
            Some(&admin_token),
            Some(json!({"code":"ENG-1","name":"War Room","capacity":20,"building":"Main","floor":1,"departmentId":dept_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let room_id = room["id"].as_str().unwrap().to_string();

        let (_, manager) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"name":"Grace","surname":"Hopper","email":"manager@example.com","password":"hunter2pass","role":"MANAGER","departmentId":dept_id})),
        )
        .await;
        let _ = manager;
        let (_, login) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email":"manager@example.com","password":"hunter2pass"})),
        )
        .await;
        let manager_token = login["tokens"]["accessToken"].as_str().unwrap().to_string();

        // Scenario A: happy booking
        let (start_a, end_a) = business_slot(3);
        let (status, reservation) = send(
            &app,
            "POST",
            "/api/v1/reservations",
            Some(&manager_token),
            Some(json!({"roomId":room_id,"title":"Team sync","startAt":start_a,"endAt":end_a})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reservation["status"], "CONFIRMED");

        // Scenario B: overlapping create is rejected with CONFLICT
        let (status, conflict) = send(
            &app,
            "POST",
            "/api/v1/reservations",
            Some(&manager_token),
            Some(json!({"roomId":room_id,"title":"Clash","startAt":start_a,"endAt":end_a})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(conflict["code"], "CONFLICT");

        // Scenario F: a user scoped to a different department is denied
        let (_, dept2) = send(&app, "POST", "/api/v1/departments", Some(&admin_token), Some(json!({"name":"Sales","code":"SAL"}))).await;
        let dept2_id = dept2["id"].as_str().unwrap().to_string();
        let (_, _) = send(
            &app,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({"name":"Rando","surname":"Outsider","email":"outsider@example.com","password":"hunter2pass","role":"USER","departmentId":dept2_id})),
        )
        .await;
        let (_, login) = send(
            &app,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email":"outsider@example.com","password":"hunter2pass"})),
        )
        .await;
        let outsider_token = login["tokens"]["accessToken"].as_str().unwrap().to_string();

        let (start_f, end_f) = business_slot(10);
        let (status, denied) = send(
            &app,
            "POST",
            "/api/v1/reservations",
            Some(&outsider_token),
            Some(json!({"roomId":room_id,"title":"Intrusion","startAt":start_f,"endAt":end_f})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(denied["code"], "CROSS_DEPARTMENT_FORBIDDEN");
    }
}
