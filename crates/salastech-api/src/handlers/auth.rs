//! Authentication handlers

use axum::{extract::State, Extension, Json};
use salastech_auth::{AuthResponse, AuthService, Claims, LoginRequest, RefreshRequest, TokenPair};
use salastech_core::{CreateUser, Role};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

fn service(state: &AppState) -> AuthService {
    AuthService::new(&state.jwt_secret, state.db.clone())
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let response = service(&state).login(&req.email, &req.password)?;
    Ok(Json(response))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = service(&state).refresh(&req.refresh_token)?;
    Ok(Json(tokens))
}

/// Current user, from the access token validated by `auth_middleware`.
pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse { id: claims.sub.clone(), role: claims.role().as_str().to_string(), department_id: claims.department_id.clone() })
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub role: String,
    pub department_id: Option<String>,
}

/// Register a new user. Gated by `require_permission("users", "create")` at
/// the router layer in production; left open here for self-service signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub department_id: Option<String>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let role = parse_role(&req.role)?;
    let department_id = req
        .department_id
        .map(|s| salastech_core::Id::parse_str(&s))
        .transpose()
        .map_err(|_| ApiError::bad_request("invalid department id"))?;

    let dto = CreateUser {
        name: req.name,
        surname: req.surname,
        email: req.email,
        password: req.password,
        role,
        department_id,
    };
    let user = service(&state).register_user(dto)?;

    Ok(Json(RegisterResponse {
        id: user.id.to_string(),
        email: user.email,
        name: user.name,
        role: user.role.as_str().to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

fn parse_role(s: &str) -> Result<Role, ApiError> {
    match s.to_uppercase().as_str() {
        "ADMIN" => Ok(Role::Admin),
        "MANAGER" => Ok(Role::Manager),
        "ADVANCED_USER" => Ok(Role::AdvancedUser),
        "USER" => Ok(Role::User),
        "GUEST" => Ok(Role::Guest),
        _ => Err(ApiError::bad_request("invalid role")),
    }
}
