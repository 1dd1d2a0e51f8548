//! SalasTech Database Layer
//!
//! SQLite-based persistence for the reservation system, plus the Booking
//! Coordinator that serializes writes per room.

pub mod connection;
pub mod repositories;
pub mod migrations;
pub mod coordinator;
pub mod error;

pub use connection::*;
pub use repositories::*;
pub use migrations::*;
pub use coordinator::{BookingCoordinator, RoomLockMap};
pub use error::{DbError, Result};
