//! Authentication service: login, token refresh and user registration.

use salastech_core::{CreateUser, Id, Role, User};
use salastech_db::{Database, UserRepository};
use thiserror::Error;

use crate::hashing::{hash_password, verify_password};
use crate::jwt::{Claims, JwtManager, TokenPair, TokenType};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Token error: {0}")]
    Token(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

impl From<SessionError> for salastech_core::Error {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::InvalidCredentials => salastech_core::Error::Unauthenticated("invalid credentials".into()),
            SessionError::UserNotFound => salastech_core::Error::NotFound { entity: "User".into(), id: String::new() },
            SessionError::WrongTokenType => salastech_core::Error::Unauthenticated("wrong token type".into()),
            SessionError::Token(m) => salastech_core::Error::Unauthenticated(m),
            SessionError::Database(m) => salastech_core::Error::StorageUnavailable(m),
        }
    }
}

pub struct AuthService {
    jwt_manager: JwtManager,
    db: Database,
}

impl AuthService {
    pub fn new(jwt_secret: &[u8], db: Database) -> Self {
        Self { jwt_manager: JwtManager::new(jwt_secret), db }
    }

    fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        let access = self
            .jwt_manager
            .create_access_token(user.id, user.role, user.department_id)
            .map_err(|e| SessionError::Token(e.to_string()))?;
        let refresh = self
            .jwt_manager
            .create_refresh_token(user.id, user.role, user.department_id)
            .map_err(|e| SessionError::Token(e.to_string()))?;
        Ok(TokenPair::new(access, refresh, self.jwt_manager.access_ttl_seconds()))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let user_repo = UserRepository::new(self.db.clone());

        let user = user_repo
            .find_by_email(email)
            .map_err(|e| SessionError::Database(e.to_string()))?
            .ok_or(SessionError::UserNotFound)?;

        let valid = verify_password(password, &user.password_hash).map_err(|_| SessionError::InvalidCredentials)?;
        if !valid {
            return Err(SessionError::InvalidCredentials);
        }

        let tokens = self.issue_pair(&user)?;
        Ok(AuthResponse { tokens, user: UserInfo::from(user) })
    }

    /// Rotate both tokens from a valid refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.jwt_manager.validate_token(refresh_token).map_err(|e| SessionError::Token(e.to_string()))?;
        if claims.token_type != TokenType::Refresh {
            return Err(SessionError::WrongTokenType);
        }

        let user_repo = UserRepository::new(self.db.clone());
        let user = user_repo
            .find_by_id(claims.user_id().ok_or(SessionError::WrongTokenType)?)
            .map_err(|e| SessionError::Database(e.to_string()))?
            .ok_or(SessionError::UserNotFound)?;

        self.issue_pair(&user)
    }

    pub fn validate(&self, token: &str) -> Result<Claims> {
        let claims = self.jwt_manager.validate_token(token).map_err(|e| SessionError::Token(e.to_string()))?;
        if claims.token_type != TokenType::Access {
            return Err(SessionError::WrongTokenType);
        }
        Ok(claims)
    }

    pub fn current_user(&self, token: &str) -> Result<User> {
        let claims = self.validate(token)?;
        let user_repo = UserRepository::new(self.db.clone());
        user_repo
            .find_by_id(claims.user_id().ok_or(SessionError::WrongTokenType)?)
            .map_err(|e| SessionError::Database(e.to_string()))?
            .ok_or(SessionError::UserNotFound)
    }

    pub fn register_user(&self, dto: CreateUser) -> Result<User> {
        let password_hash = hash_password(&dto.password).map_err(|e| SessionError::Token(e.to_string()))?;
        let user = User::new(dto.name, dto.surname, dto.email, password_hash, dto.role, dto.department_id);

        let user_repo = UserRepository::new(self.db.clone());
        user_repo.create(&user).map_err(|e| SessionError::Database(e.to_string()))?;
        Ok(user)
    }

    pub fn change_password(&self, user_id: Id, new_password: &str) -> Result<()> {
        let hash = hash_password(new_password).map_err(|e| SessionError::Token(e.to_string()))?;
        let user_repo = UserRepository::new(self.db.clone());
        user_repo
            .update_password(user_id, &hash, chrono::Utc::now())
            .map_err(|e| SessionError::Database(e.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub tokens: TokenPair,
    pub user: UserInfo,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: String,
    pub department_id: Option<String>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name,
            surname: user.surname,
            email: user.email,
            role: user.role.as_str().to_string(),
            department_id: user.department_id.map(|id| id.to_string()),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use salastech_core::Role;
    use salastech_db::Database;

    fn db() -> Database {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn register_then_login_round_trips() {
        let db = db();
        let service = AuthService::new(b"test-secret-key-32-bytes-long!!", db);
        let dto = CreateUser {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "s3cretpass".into(),
            role: Role::User,
            department_id: None,
        };
        service.register_user(dto).unwrap();

        let resp = service.login("ada@example.com", "s3cretpass").unwrap();
        assert_eq!(resp.user.email, "ada@example.com");

        let claims = service.validate(&resp.tokens.access_token).unwrap();
        assert_eq!(claims.role(), Role::User);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let db = db();
        let service = AuthService::new(b"test-secret-key-32-bytes-long!!", db);
        let dto = CreateUser {
            name: "Ada".into(),
            surname: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "s3cretpass".into(),
            role: Role::User,
            department_id: None,
        };
        service.register_user(dto).unwrap();

        let err = service.login("ada@example.com", "wrong").unwrap_err();
        assert!(matches!(err, SessionError::InvalidCredentials));
    }
}
