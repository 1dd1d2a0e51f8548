//! Common types used throughout the reservation core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier type alias
pub type Id = Uuid;

/// Timestamp type alias
pub type Timestamp = DateTime<Utc>;

/// User roles. Privileged roles (`Admin`, `Manager`, `AdvancedUser`) bypass the
/// department scope check and get auto-approval; `User`/`Guest` are scoped to
/// their own department and default to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    AdvancedUser,
    User,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Manager => "MANAGER",
            Role::AdvancedUser => "ADVANCED_USER",
            Role::User => "USER",
            Role::Guest => "GUEST",
        }
    }

    /// Roles that auto-confirm a reservation regardless of duration
    pub fn auto_confirms(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager | Role::AdvancedUser)
    }

    /// Roles scoped to their own department when booking
    pub fn is_department_scoped(&self) -> bool {
        matches!(self, Role::User | Role::Guest)
    }

    /// Roles allowed to approve/reject pending reservations
    pub fn can_approve(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Reservation lifecycle status. Transitions are enforced by the Booking
/// Coordinator, never set ad hoc by a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    InProgress,
    Finished,
    Cancelled,
}

impl ReservationStatus {
    /// The statuses relevant to conflict detection (active reservation set)
    pub const ACTIVE: [ReservationStatus; 3] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::InProgress,
    ];

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Finished | ReservationStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::InProgress => "IN_PROGRESS",
            ReservationStatus::Finished => "FINISHED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "IN_PROGRESS" => Some(ReservationStatus::InProgress),
            "FINISHED" => Some(ReservationStatus::Finished),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

/// Weekday, used to index the business-hours table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<chrono::Weekday> for Weekday {
    fn from(w: chrono::Weekday) -> Self {
        match w {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }
}

/// A room's open/close window for one weekday; `None` means closed all day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusinessWindow {
    pub open: chrono::NaiveTime,
    pub close: chrono::NaiveTime,
}

/// Minimum reservation duration (I2)
pub const MIN_DURATION_MINUTES: i64 = 30;
/// Maximum reservation duration (I2)
pub const MAX_DURATION_MINUTES: i64 = 8 * 60;
/// Lower bound of the notice window
pub const MIN_NOTICE_HOURS: i64 = 2;
/// Upper bound of the notice window
pub const MAX_NOTICE_DAYS: i64 = 30;
/// Duration at or below which a non-privileged user is auto-confirmed
pub const AUTO_CONFIRM_DURATION_MINUTES: i64 = 2 * 60;
/// Duration above which a non-privileged user is always forced to PENDING
pub const FORCE_PENDING_DURATION_MINUTES: i64 = 4 * 60;
