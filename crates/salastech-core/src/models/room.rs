//! Room model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, RoomStatus, Timestamp};

/// Room entity for reservation scheduling
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Room {
    pub id: Id,

    #[validate(length(min = 2, max = 20), custom = "validate_room_code")]
    pub code: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub capacity: i32,

    pub building: String,

    pub floor: i32,

    pub department_id: Id,

    pub status: RoomStatus,

    pub responsible: Option<Id>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Room codes are uppercase alphanumeric with interior hyphens only (I/3).
fn validate_room_code(code: &str) -> Result<(), validator::ValidationError> {
    let bytes_ok = code
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-');
    let edges_ok = !code.starts_with('-') && !code.ends_with('-');
    if bytes_ok && edges_ok {
        Ok(())
    } else {
        Err(validator::ValidationError::new("room_code"))
    }
}

impl Room {
    pub fn new(code: String, name: String, capacity: i32, building: String, floor: i32, department_id: Id) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            code,
            name,
            capacity,
            building,
            floor,
            department_id,
            status: RoomStatus::Active,
            responsible: None,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RoomStatus::Active
    }
}

/// Room creation DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoom {
    #[validate(length(min = 2, max = 20), custom = "validate_room_code")]
    pub code: String,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    pub capacity: i32,
    pub building: String,
    pub floor: i32,
    pub department_id: Id,
    pub responsible: Option<Id>,
    pub description: Option<String>,
}

/// Room update DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoom {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub status: Option<RoomStatus>,
    pub responsible: Option<Id>,
    pub description: Option<String>,
}
