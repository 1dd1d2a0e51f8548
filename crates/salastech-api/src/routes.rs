//! Route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Authentication routes (public)
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/me", get(handlers::auth::me))
        .route("/register", post(handlers::auth::register))
}

/// Reservation routes (protected)
pub fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::reservations::list))
        .route("/", post(handlers::reservations::create))
        .route("/:id", get(handlers::reservations::get))
        .route("/:id", put(handlers::reservations::update))
        .route("/:id", axum::routing::delete(handlers::reservations::cancel))
        .route("/:id/approve", post(handlers::reservations::approve))
        .route("/:id/reject", post(handlers::reservations::reject))
}

/// Room routes, including admin-gated CRUD
pub fn room_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::rooms::list))
        .route("/", post(handlers::rooms::create))
        .route("/available", get(handlers::rooms::available))
        .route("/:id", get(handlers::rooms::get))
        .route("/:id", put(handlers::rooms::update))
        .route("/:id", axum::routing::delete(handlers::rooms::delete))
        .route("/:id/availability", get(handlers::rooms::availability))
}

/// Department routes (interface-level CRUD)
pub fn department_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::departments::list))
        .route("/", post(handlers::departments::create))
        .route("/:id", get(handlers::departments::get))
}

/// Report routes, MANAGER+ only
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/usage", get(handlers::reports::usage))
        .route("/occupancy", get(handlers::reports::occupancy))
        .route("/department-usage", get(handlers::reports::department_usage))
        .route("/user-activity", get(handlers::reports::user_activity))
        .route("/statistics", get(handlers::reports::statistics))
}
