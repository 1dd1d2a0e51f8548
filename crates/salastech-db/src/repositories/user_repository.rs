//! User repository

use rusqlite::{params, Row};
use salastech_core::{CreateUser, Id, Role, User};

use crate::{Database, DbError, Result};

pub struct UserRepository {
    db: Database,
}

impl UserRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn role_from_str(s: &str) -> Role {
        match s {
            "ADMIN" => Role::Admin,
            "MANAGER" => Role::Manager,
            "ADVANCED_USER" => Role::AdvancedUser,
            "USER" => Role::User,
            "GUEST" => Role::Guest,
            _ => Role::Guest,
        }
    }

    fn row_to_user(row: &Row) -> rusqlite::Result<User> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let surname: String = row.get(2)?;
        let email: String = row.get(3)?;
        let password_hash: String = row.get(4)?;
        let role_str: String = row.get(5)?;
        let department_id: Option<String> = row.get(6)?;
        let created_at: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        Ok(User {
            id: Id::parse_str(&id).unwrap_or_else(|_| Id::new_v4()),
            name,
            surname,
            email,
            password_hash,
            role: Self::role_from_str(&role_str),
            department_id: department_id.and_then(|s| Id::parse_str(&s).ok()),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    const COLUMNS: &'static str =
        "id, name, surname, email, password_hash, role, department_id, created_at, updated_at";

    pub fn create(&self, user: &User) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;

        conn.execute(
            "INSERT INTO users (id, name, surname, email, password_hash, role, department_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.name,
                user.surname,
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.department_id.map(|id| id.to_string()),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
                DbError::ConstraintViolation(format!("email already in use: {}", user.email))
            }
            other => other.into(),
        })?;

        Ok(())
    }

    pub fn find_by_id(&self, id: Id) -> Result<Option<User>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM users WHERE id = ?", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([id.to_string()], Self::row_to_user).ok())
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM users WHERE email = ?", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([email.to_lowercase()], Self::row_to_user).ok())
    }

    pub fn find_all(&self, limit: u32, offset: u32) -> Result<Vec<User>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([limit, offset], Self::row_to_user)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(users)
    }

    pub fn update(&self, user: &User) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;

        conn.execute(
            "UPDATE users SET name = ?, surname = ?, role = ?, department_id = ?, updated_at = ?
             WHERE id = ?",
            params![
                user.name,
                user.surname,
                user.role.as_str(),
                user.department_id.map(|id| id.to_string()),
                user.updated_at.to_rfc3339(),
                user.id.to_string(),
            ],
        )?;

        Ok(())
    }

    pub fn update_password(&self, id: Id, password_hash: &str, now: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?",
            params![password_hash, now.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Id) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute("DELETE FROM users WHERE id = ?", [id.to_string()])?;
        Ok(())
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM users")?;
        Ok(stmt.query_row([], |row| row.get(0))?)
    }
}

/// Build a `User` ready for insertion from a creation DTO and a pre-hashed password.
pub fn user_from_create(dto: CreateUser, password_hash: String) -> User {
    User::new(dto.name, dto.surname, dto.email, password_hash, dto.role, dto.department_id)
}
