//! User model

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::{Id, Role, Timestamp};

/// User entity representing system users (students, staff, admins)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct User {
    pub id: Id,

    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 100))]
    pub surname: String,

    #[validate(email)]
    pub email: String,

    /// Password hash (Argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    pub department_id: Option<Id>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    pub fn new(
        name: String,
        surname: String,
        email: String,
        password_hash: String,
        role: Role,
        department_id: Option<Id>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Id::new_v4(),
            name,
            surname,
            email: email.to_lowercase(),
            password_hash,
            role,
            department_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User creation DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(min = 1, max = 100))]
    pub surname: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 8))]
    pub password: String,

    pub role: Role,
    pub department_id: Option<Id>,
}

/// User update DTO
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub surname: Option<String>,

    pub role: Option<Role>,
    pub department_id: Option<Id>,
}
