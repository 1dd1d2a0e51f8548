//! Application state

use std::sync::Arc;

use salastech_auth::{AuthState, TokenStore};
use salastech_core::clock::{Calendar, SystemClock};
use salastech_db::{coordinator::BookingCoordinator, Database};

/// Shared application state, handed to every handler via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth_state: AuthState,
    pub jwt_secret: Vec<u8>,
    pub coordinator: Arc<BookingCoordinator<SystemClock>>,
    pub token_store: Arc<TokenStore>,
}

impl AppState {
    pub fn new(db: Database, jwt_secret: Vec<u8>) -> Self {
        Self::with_calendar(db, jwt_secret, Calendar::brazilian_federal())
    }

    pub fn with_calendar(db: Database, jwt_secret: Vec<u8>, calendar: Calendar) -> Self {
        let coordinator = BookingCoordinator::new(db.clone(), SystemClock, calendar);
        Self {
            db,
            auth_state: AuthState::new(jwt_secret.clone()),
            jwt_secret,
            coordinator: Arc::new(coordinator),
            token_store: Arc::new(TokenStore::new()),
        }
    }
}
