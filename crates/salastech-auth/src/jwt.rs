//! JWT access/refresh token management

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use salastech_core::{Id, Role};

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("Token creation failed: {0}")]
    Creation(String),

    #[error("Token validation failed: {0}")]
    Validation(String),

    #[error("Token expired")]
    Expired,
}

pub type Result<T> = std::result::Result<T, JwtError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims for this system — no offline/device claims, since there is no
/// offline-first client to support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub department_id: Option<String>,
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<Id> {
        Id::parse_str(&self.sub).ok()
    }

    pub fn department_id(&self) -> Option<Id> {
        self.department_id.as_deref().and_then(|s| Id::parse_str(s).ok())
    }

    pub fn role(&self) -> Role {
        role_from_str(&self.role)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

fn role_from_str(s: &str) -> Role {
    match s {
        "ADMIN" => Role::Admin,
        "MANAGER" => Role::Manager,
        "ADVANCED_USER" => Role::AdvancedUser,
        "USER" => Role::User,
        _ => Role::Guest,
    }
}

/// JWT token manager: `HS256` access tokens (15 min) / refresh tokens (7 day).
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(secret, Duration::minutes(15), Duration::days(7))
    }

    pub fn with_ttls(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(&self, user_id: Id, role: Role, department_id: Option<Id>, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            department_id: department_id.map(|id| id.to_string()),
            token_type,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Id::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| JwtError::Creation(e.to_string()))
    }

    pub fn create_access_token(&self, user_id: Id, role: Role, department_id: Option<Id>) -> Result<String> {
        self.issue(user_id, role, department_id, TokenType::Access)
    }

    pub fn create_refresh_token(&self, user_id: Id, role: Role, department_id: Option<Id>) -> Result<String> {
        self.issue(user_id, role, department_id, TokenType::Refresh)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Validation(e.to_string()),
            })
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

/// Token pair for authentication responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self { access_token, refresh_token, expires_in, token_type: "Bearer".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let manager = JwtManager::new(b"test-secret-key-32-bytes-long!!");
        let user_id = Id::new_v4();
        let token = manager.create_access_token(user_id, Role::Manager, None).unwrap();
        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.role(), Role::Manager);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn refresh_token_carries_its_own_type() {
        let manager = JwtManager::new(b"test-secret-key-32-bytes-long!!");
        let token = manager.create_refresh_token(Id::new_v4(), Role::User, None).unwrap();
        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = JwtManager::with_ttls(b"test-secret-key-32-bytes-long!!", Duration::seconds(-1), Duration::days(7));
        let token = manager.create_access_token(Id::new_v4(), Role::User, None).unwrap();
        let err = manager.validate_token(&token).unwrap_err();
        assert!(matches!(err, JwtError::Expired));
    }
}
