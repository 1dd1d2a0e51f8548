//! Department handlers (interface-level CRUD)

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use salastech_auth::{Claims, PermissionChecker};
use salastech_core::{CreateDepartment, Department, Id};
use salastech_db::DepartmentRepository;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<DepartmentDto>>, ApiError> {
    let repo = DepartmentRepository::new(state.db.clone());
    let departments = repo.find_all()?;
    Ok(Json(departments.into_iter().map(DepartmentDto::from).collect()))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Id>) -> Result<Json<DepartmentDto>, ApiError> {
    let repo = DepartmentRepository::new(state.db.clone());
    let department = repo.find_by_id(id)?.ok_or_else(|| ApiError::not_found("Department", &id.to_string()))?;
    Ok(Json(DepartmentDto::from(department)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub name: String,
    pub code: String,
    pub manager_id: Option<Id>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateRequest>,
) -> Result<Json<DepartmentDto>, ApiError> {
    if !PermissionChecker::has_permission(claims.role(), "departments", "create") {
        return Err(ApiError::forbidden("role cannot create departments"));
    }

    let dto = CreateDepartment { name: req.name, code: req.code, manager_id: req.manager_id };
    validator::Validate::validate(&dto).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut department = Department::new(dto.name, dto.code);
    department.manager_id = dto.manager_id;

    let repo = DepartmentRepository::new(state.db.clone());
    repo.create(&department)?;
    Ok(Json(DepartmentDto::from(department)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDto {
    pub id: String,
    pub name: String,
    pub code: String,
    pub manager_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Department> for DepartmentDto {
    fn from(d: Department) -> Self {
        Self {
            id: d.id.to_string(),
            name: d.name,
            code: d.code,
            manager_id: d.manager_id.map(|id| id.to_string()),
            created_at: d.created_at.to_rfc3339(),
            updated_at: d.updated_at.to_rfc3339(),
        }
    }
}
