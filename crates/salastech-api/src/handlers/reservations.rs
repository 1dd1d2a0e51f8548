//! Reservation handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use salastech_auth::{Claims, PermissionChecker};
use salastech_core::{CreateReservation, Id, Reservation, ReservationStatus, Timestamp, UpdateReservation};
use salastech_db::ReservationRepository;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub room_id: Option<Id>,
    pub user_id: Option<Id>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ReservationDto>>, ApiError> {
    let status = match q.status.as_deref() {
        Some(s) => Some(ReservationStatus::from_str_opt(s).ok_or_else(|| ApiError::bad_request("invalid status filter"))?),
        None => None,
    };

    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT).max(1);
    let offset = q.offset.unwrap_or(0);

    let repo = ReservationRepository::new(state.db.clone());
    let reservations = repo.find_filtered(status, q.room_id, q.user_id, q.start, q.end, limit, offset)?;

    Ok(Json(reservations.into_iter().map(ReservationDto::from).collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Id>) -> Result<Json<ReservationDto>, ApiError> {
    let repo = ReservationRepository::new(state.db.clone());
    let reservation =
        repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Reservation", &id.to_string()))?;
    Ok(Json(ReservationDto::from(reservation)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub room_id: Id,
    pub title: String,
    pub description: Option<String>,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRequest>,
) -> Result<(axum::http::StatusCode, Json<ReservationDto>), ApiError> {
    let user_id = claims.user_id().ok_or_else(|| ApiError::unauthenticated("invalid subject claim"))?;

    let dto = CreateReservation {
        room_id: req.room_id,
        title: req.title,
        description: req.description,
        start_at: req.start_at,
        end_at: req.end_at,
    };
    validator::Validate::validate(&dto).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let reservation = state
        .coordinator
        .create(
            claims.role(),
            claims.department_id(),
            user_id,
            dto.room_id,
            dto.title,
            dto.description,
            dto.start_at,
            dto.end_at,
        )
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(ReservationDto::from(reservation))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_at: Timestamp,
    pub end_at: Timestamp,
}

/// Only the interval is reschedulable through the coordinator; title and
/// description edits don't touch conflict detection and go straight to the
/// repository once the reschedule itself has been accepted.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<ReservationDto>, ApiError> {
    let dto = UpdateReservation {
        title: req.title,
        description: req.description,
        start_at: Some(req.start_at),
        end_at: Some(req.end_at),
    };
    validator::Validate::validate(&dto).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut reservation =
        state.coordinator.reschedule(claims.role(), claims.department_id(), id, req.start_at, req.end_at).await?;

    if dto.title.is_some() || dto.description.is_some() {
        if let Some(title) = dto.title {
            reservation.title = title;
        }
        if let Some(description) = dto.description {
            reservation.description = Some(description);
        }
        let repo = ReservationRepository::new(state.db.clone());
        repo.update(&reservation)?;
    }

    Ok(Json(ReservationDto::from(reservation)))
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub reason: Option<String>,
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
    Query(q): Query<CancelQuery>,
) -> Result<axum::http::StatusCode, ApiError> {
    let action = if claims.role().is_department_scoped() { "cancel_own" } else { "cancel" };
    if !PermissionChecker::has_permission(claims.role(), "reservations", action) {
        return Err(ApiError::forbidden("role cannot cancel reservations"));
    }
    let requester_id = claims.user_id().ok_or_else(|| ApiError::unauthenticated("invalid subject claim"))?;
    state.coordinator.cancel(claims.role(), requester_id, claims.department_id(), id, q.reason).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
) -> Result<Json<ReservationDto>, ApiError> {
    if !PermissionChecker::has_permission(claims.role(), "reservations", "approve") {
        return Err(ApiError::forbidden("role cannot approve reservations"));
    }
    let approver_id = claims.user_id().ok_or_else(|| ApiError::unauthenticated("invalid subject claim"))?;
    let reservation = state.coordinator.approve(approver_id, id).await?;
    Ok(Json(ReservationDto::from(reservation)))
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<ReservationDto>, ApiError> {
    if !PermissionChecker::has_permission(claims.role(), "reservations", "reject") {
        return Err(ApiError::forbidden("role cannot reject reservations"));
    }
    let reservation = state.coordinator.reject(id, req.reason).await?;
    Ok(Json(ReservationDto::from(reservation)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start_at: String,
    pub end_at: String,
    pub status: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub auto_approved: bool,
    pub cancellation_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            room_id: r.room_id.to_string(),
            user_id: r.user_id.to_string(),
            title: r.title,
            description: r.description,
            start_at: r.start_at.to_rfc3339(),
            end_at: r.end_at.to_rfc3339(),
            status: r.status.as_str().to_string(),
            approved_by: r.approved_by.map(|id| id.to_string()),
            approved_at: r.approved_at.map(|t| t.to_rfc3339()),
            auto_approved: r.auto_approved,
            cancellation_reason: r.cancellation_reason,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}
