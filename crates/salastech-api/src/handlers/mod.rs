//! API handlers

pub mod auth;
pub mod departments;
pub mod health;
pub mod reports;
pub mod reservations;
pub mod rooms;
