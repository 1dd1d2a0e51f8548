//! Authentication middleware for Axum

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::jwt::{Claims, JwtManager, TokenType};
use crate::permissions::PermissionChecker;

/// Shared state the auth middleware needs: just the JWT secret.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: Vec<u8>,
}

impl AuthState {
    pub fn new(jwt_secret: Vec<u8>) -> Self {
        Self { jwt_secret }
    }
}

/// Extract and validate the bearer access token, stashing `Claims` in
/// request extensions for downstream handlers/extractors.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = request.headers().get("Authorization").and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    let jwt_manager = JwtManager::new(&state.jwt_secret);

    match jwt_manager.validate_token(token) {
        Ok(claims) if claims.token_type == TokenType::Access => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Permission-checking middleware generator.
pub fn require_permission(
    resource: &'static str,
    action: &'static str,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, StatusCode>> + Send>> + Clone
{
    move |request: Request, next: Next| {
        Box::pin(async move {
            let claims = request.extensions().get::<Claims>().ok_or(StatusCode::UNAUTHORIZED)?;

            if PermissionChecker::has_permission(claims.role(), resource, action) {
                Ok(next.run(request).await)
            } else {
                Err(StatusCode::FORBIDDEN)
            }
        })
    }
}

/// Extract claims from a request
pub fn get_claims(request: &Request) -> Option<&Claims> {
    request.extensions().get::<Claims>()
}

/// Permission guard macro
#[macro_export]
macro_rules! require {
    ($resource:expr, $action:expr) => {
        axum::middleware::from_fn(move |request, next| {
            $crate::middleware::require_permission($resource, $action)(request, next)
        })
    };
}

pub struct AuthError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
