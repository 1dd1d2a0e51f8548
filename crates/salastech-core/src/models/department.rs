//! Department model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, Timestamp};

/// Department entity. Used only as a foreign-key target for rooms/users and
/// for authorisation scoping — no department-level business rules live here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Department {
    pub id: Id,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 2, max = 20))]
    pub code: String,

    pub manager_id: Option<Id>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Department {
    pub fn new(name: String, code: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            name,
            code,
            manager_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Department creation DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDepartment {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 2, max = 20))]
    pub code: String,

    pub manager_id: Option<Id>,
}
