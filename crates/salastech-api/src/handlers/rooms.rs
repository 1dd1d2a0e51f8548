//! Room handlers

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use salastech_auth::{Claims, PermissionChecker};
use salastech_core::{CreateRoom, Id, Reservation, Room, RoomStatus, Timestamp, UpdateRoom};
use salastech_db::{ReservationRepository, RoomRepository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::reservations::ReservationDto;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn list(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Vec<RoomDto>>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT).max(1);
    let offset = q.offset.unwrap_or(0);

    let repo = RoomRepository::new(state.db.clone());
    let rooms = repo.find_all(limit, offset)?;
    Ok(Json(rooms.into_iter().map(RoomDto::from).collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Id>) -> Result<Json<RoomDto>, ApiError> {
    let repo = RoomRepository::new(state.db.clone());
    let room = repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Room", &id.to_string()))?;
    Ok(Json(RoomDto::from(room)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableQuery {
    pub start: Timestamp,
    pub end: Timestamp,
    pub department_id: Option<Id>,
    pub capacity: Option<i32>,
}

/// Rooms with no conflicting active reservation in `[start, end)`, optionally
/// narrowed by department and minimum capacity.
pub async fn available(
    State(state): State<AppState>,
    Query(q): Query<AvailableQuery>,
) -> Result<Json<Vec<RoomDto>>, ApiError> {
    if q.end <= q.start {
        return Err(ApiError::bad_request("end must be after start"));
    }

    let room_repo = RoomRepository::new(state.db.clone());
    let reservation_repo = ReservationRepository::new(state.db.clone());

    let candidates = match q.department_id {
        Some(dept_id) => room_repo.find_by_department(dept_id)?,
        None => room_repo.find_all(MAX_LIMIT, 0)?,
    };

    let mut free = Vec::new();
    for room in candidates {
        if !room.is_active() {
            continue;
        }
        if let Some(min_capacity) = q.capacity {
            if room.capacity < min_capacity {
                continue;
            }
        }
        let conflicts = reservation_repo.find_conflicts(room.id, q.start, q.end, None)?;
        if conflicts.is_empty() {
            free.push(RoomDto::from(room));
        }
    }

    Ok(Json(free))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Reservations occupying a single room's calendar in `[start, end)`
/// — the detail view behind `available`'s yes/no check.
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<Vec<ReservationDto>>, ApiError> {
    let room_repo = RoomRepository::new(state.db.clone());
    room_repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Room", &id.to_string()))?;

    let reservation_repo = ReservationRepository::new(state.db.clone());
    let occupying: Vec<Reservation> = reservation_repo
        .find_by_room(id, false)?
        .into_iter()
        .filter(|r| r.overlaps(q.start, q.end))
        .collect();

    Ok(Json(occupying.into_iter().map(ReservationDto::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub code: String,
    pub name: String,
    pub capacity: i32,
    pub building: String,
    pub floor: i32,
    pub department_id: Id,
    pub responsible: Option<Id>,
    pub description: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<RoomDto>, ApiError> {
    require_admin(&claims)?;

    let dto = CreateRoom {
        code: req.code,
        name: req.name,
        capacity: req.capacity,
        building: req.building,
        floor: req.floor,
        department_id: req.department_id,
        responsible: req.responsible,
        description: req.description,
    };
    validator::Validate::validate(&dto).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let room = Room::new(dto.code, dto.name, dto.capacity, dto.building, dto.floor, dto.department_id);
    let repo = RoomRepository::new(state.db.clone());
    repo.create(&room)?;
    Ok(Json(RoomDto::from(room)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub status: Option<RoomStatus>,
    pub responsible: Option<Id>,
    pub description: Option<String>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<RoomDto>, ApiError> {
    require_admin(&claims)?;

    let dto = UpdateRoom {
        name: req.name,
        capacity: req.capacity,
        building: req.building,
        floor: req.floor,
        status: req.status,
        responsible: req.responsible,
        description: req.description,
    };

    let repo = RoomRepository::new(state.db.clone());
    let mut room = repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Room", &id.to_string()))?;

    if let Some(name) = dto.name {
        room.name = name;
    }
    if let Some(capacity) = dto.capacity {
        room.capacity = capacity;
    }
    if let Some(building) = dto.building {
        room.building = building;
    }
    if let Some(floor) = dto.floor {
        room.floor = floor;
    }
    if let Some(status) = dto.status {
        room.status = status;
    }
    if dto.responsible.is_some() {
        room.responsible = dto.responsible;
    }
    if dto.description.is_some() {
        room.description = dto.description;
    }
    room.updated_at = chrono::Utc::now();

    repo.update(&room)?;
    Ok(Json(RoomDto::from(room)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Id>,
) -> Result<axum::http::StatusCode, ApiError> {
    require_admin(&claims)?;

    let repo = RoomRepository::new(state.db.clone());
    repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Room", &id.to_string()))?;
    repo.delete(id)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

fn require_admin(claims: &Claims) -> Result<(), ApiError> {
    if !PermissionChecker::has_permission(claims.role(), "rooms", "write") {
        return Err(ApiError::forbidden("only administrators manage rooms"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub id: String,
    pub code: String,
    pub name: String,
    pub capacity: i32,
    pub building: String,
    pub floor: i32,
    pub department_id: String,
    pub status: String,
    pub responsible: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Room> for RoomDto {
    fn from(r: Room) -> Self {
        Self {
            id: r.id.to_string(),
            code: r.code,
            name: r.name,
            capacity: r.capacity,
            building: r.building,
            floor: r.floor,
            department_id: r.department_id.to_string(),
            status: format!("{:?}", r.status).to_uppercase(),
            responsible: r.responsible.map(|id| id.to_string()),
            description: r.description,
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.to_rfc3339(),
        }
    }
}
