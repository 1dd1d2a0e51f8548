//! Reporting handlers (MANAGER+). Each report aggregates over the live
//! reservation set in the requested `[startDate, endDate)` window — there is
//! no separate analytics store; reports are computed on demand.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use salastech_auth::{Claims, PermissionChecker};
use salastech_core::{Id, ReservationStatus, Timestamp};
use salastech_db::{DepartmentRepository, ReservationRepository, RoomRepository, UserRepository};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Timestamp,
    pub end_date: Timestamp,
}

fn require_manager(claims: &Claims) -> Result<(), ApiError> {
    if !PermissionChecker::has_permission(claims.role(), "reports", "read") {
        return Err(ApiError::forbidden("reports require manager or admin role"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub total_reservations: usize,
    pub by_status: HashMap<String, usize>,
    pub total_hours_booked: f64,
}

pub async fn usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<UsageReport>, ApiError> {
    require_manager(&claims)?;

    let repo = ReservationRepository::new(state.db.clone());
    let reservations = repo.find_filtered(None, None, None, Some(q.start_date), Some(q.end_date), u32::MAX, 0)?;

    let mut by_status = HashMap::new();
    let mut total_hours = 0.0;
    for r in &reservations {
        *by_status.entry(r.status.as_str().to_string()).or_insert(0) += 1;
        total_hours += r.duration().num_minutes() as f64 / 60.0;
    }

    Ok(Json(UsageReport { total_reservations: reservations.len(), by_status, total_hours_booked: total_hours }))
}

#[derive(Debug, Serialize)]
pub struct RoomOccupancy {
    pub room_id: String,
    pub room_code: String,
    pub hours_booked: f64,
    pub reservation_count: usize,
}

#[derive(Debug, Serialize)]
pub struct OccupancyReport {
    pub rooms: Vec<RoomOccupancy>,
}

pub async fn occupancy(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<OccupancyReport>, ApiError> {
    require_manager(&claims)?;

    let room_repo = RoomRepository::new(state.db.clone());
    let reservation_repo = ReservationRepository::new(state.db.clone());

    let rooms = room_repo.find_all(u32::MAX, 0)?;
    let mut entries = Vec::with_capacity(rooms.len());
    for room in rooms {
        let reservations =
            reservation_repo.find_filtered(None, Some(room.id), None, Some(q.start_date), Some(q.end_date), u32::MAX, 0)?;
        let hours: f64 = reservations.iter().map(|r| r.duration().num_minutes() as f64 / 60.0).sum();
        entries.push(RoomOccupancy {
            room_id: room.id.to_string(),
            room_code: room.code,
            hours_booked: hours,
            reservation_count: reservations.len(),
        });
    }

    Ok(Json(OccupancyReport { rooms: entries }))
}

#[derive(Debug, Serialize)]
pub struct DepartmentUsage {
    pub department_id: String,
    pub department_name: String,
    pub reservation_count: usize,
    pub hours_booked: f64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentUsageReport {
    pub departments: Vec<DepartmentUsage>,
}

pub async fn department_usage(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<DepartmentUsageReport>, ApiError> {
    require_manager(&claims)?;

    let dept_repo = DepartmentRepository::new(state.db.clone());
    let room_repo = RoomRepository::new(state.db.clone());
    let reservation_repo = ReservationRepository::new(state.db.clone());

    let departments = dept_repo.find_all()?;
    let mut entries = Vec::with_capacity(departments.len());
    for dept in departments {
        let rooms = room_repo.find_by_department(dept.id)?;
        let mut count = 0usize;
        let mut hours = 0.0;
        for room in rooms {
            let reservations = reservation_repo.find_filtered(
                None,
                Some(room.id),
                None,
                Some(q.start_date),
                Some(q.end_date),
                u32::MAX,
                0,
            )?;
            count += reservations.len();
            hours += reservations.iter().map(|r| r.duration().num_minutes() as f64 / 60.0).sum::<f64>();
        }
        entries.push(DepartmentUsage {
            department_id: dept.id.to_string(),
            department_name: dept.name,
            reservation_count: count,
            hours_booked: hours,
        });
    }

    Ok(Json(DepartmentUsageReport { departments: entries }))
}

#[derive(Debug, Serialize)]
pub struct UserActivity {
    pub user_id: String,
    pub user_name: String,
    pub reservation_count: usize,
    pub cancelled_count: usize,
}

#[derive(Debug, Serialize)]
pub struct UserActivityReport {
    pub users: Vec<UserActivity>,
}

pub async fn user_activity(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<UserActivityReport>, ApiError> {
    require_manager(&claims)?;

    let user_repo = UserRepository::new(state.db.clone());
    let reservation_repo = ReservationRepository::new(state.db.clone());
    let reservations = reservation_repo.find_filtered(None, None, None, Some(q.start_date), Some(q.end_date), u32::MAX, 0)?;

    let mut by_user: HashMap<Id, (usize, usize)> = HashMap::new();
    for r in &reservations {
        let entry = by_user.entry(r.user_id).or_insert((0, 0));
        entry.0 += 1;
        if r.status == ReservationStatus::Cancelled {
            entry.1 += 1;
        }
    }

    let mut users = Vec::with_capacity(by_user.len());
    for (user_id, (count, cancelled)) in by_user {
        let name = user_repo
            .find_by_id(user_id)?
            .map(|u| format!("{} {}", u.name, u.surname))
            .unwrap_or_else(|| "unknown".to_string());
        users.push(UserActivity { user_id: user_id.to_string(), user_name: name, reservation_count: count, cancelled_count: cancelled });
    }

    Ok(Json(UserActivityReport { users }))
}

#[derive(Debug, Serialize)]
pub struct StatisticsReport {
    pub total_reservations: usize,
    pub confirmed: usize,
    pub cancelled: usize,
    pub finished: usize,
    pub pending: usize,
    pub auto_approved: usize,
    pub total_rooms: usize,
    pub total_departments: usize,
}

pub async fn statistics(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<DateRangeQuery>,
) -> Result<Json<StatisticsReport>, ApiError> {
    require_manager(&claims)?;

    let reservation_repo = ReservationRepository::new(state.db.clone());
    let room_repo = RoomRepository::new(state.db.clone());
    let dept_repo = DepartmentRepository::new(state.db.clone());

    let reservations = reservation_repo.find_filtered(None, None, None, Some(q.start_date), Some(q.end_date), u32::MAX, 0)?;
    let rooms = room_repo.find_all(u32::MAX, 0)?;
    let departments = dept_repo.find_all()?;

    let mut report = StatisticsReport {
        total_reservations: reservations.len(),
        confirmed: 0,
        cancelled: 0,
        finished: 0,
        pending: 0,
        auto_approved: 0,
        total_rooms: rooms.len(),
        total_departments: departments.len(),
    };
    for r in &reservations {
        match r.status {
            ReservationStatus::Confirmed => report.confirmed += 1,
            ReservationStatus::Cancelled => report.cancelled += 1,
            ReservationStatus::Finished => report.finished += 1,
            ReservationStatus::Pending => report.pending += 1,
            ReservationStatus::InProgress => {}
        }
        if r.auto_approved {
            report.auto_approved += 1;
        }
    }

    Ok(Json(report))
}
