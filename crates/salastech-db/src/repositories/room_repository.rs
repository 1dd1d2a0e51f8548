//! Room repository

use rusqlite::{params, Row};
use salastech_core::{Id, Room, RoomStatus};

use crate::{Database, DbError, Result};

pub struct RoomRepository {
    db: Database,
}

impl RoomRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn status_from_str(s: &str) -> RoomStatus {
        match s {
            "ACTIVE" => RoomStatus::Active,
            "INACTIVE" => RoomStatus::Inactive,
            "MAINTENANCE" => RoomStatus::Maintenance,
            _ => RoomStatus::Inactive,
        }
    }

    fn status_to_str(s: RoomStatus) -> &'static str {
        match s {
            RoomStatus::Active => "ACTIVE",
            RoomStatus::Inactive => "INACTIVE",
            RoomStatus::Maintenance => "MAINTENANCE",
        }
    }

    fn row_to_room(row: &Row) -> rusqlite::Result<Room> {
        let id: String = row.get(0)?;
        let code: String = row.get(1)?;
        let name: String = row.get(2)?;
        let capacity: i32 = row.get(3)?;
        let building: String = row.get(4)?;
        let floor: i32 = row.get(5)?;
        let department_id: String = row.get(6)?;
        let status: String = row.get(7)?;
        let responsible: Option<String> = row.get(8)?;
        let description: Option<String> = row.get(9)?;
        let created_at: String = row.get(10)?;
        let updated_at: String = row.get(11)?;

        Ok(Room {
            id: Id::parse_str(&id).unwrap_or_else(|_| Id::new_v4()),
            code,
            name,
            capacity,
            building,
            floor,
            department_id: Id::parse_str(&department_id).unwrap_or_else(|_| Id::new_v4()),
            status: Self::status_from_str(&status),
            responsible: responsible.and_then(|s| Id::parse_str(&s).ok()),
            description,
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    const COLUMNS: &'static str =
        "id, code, name, capacity, building, floor, department_id, status, responsible, description, created_at, updated_at";

    pub fn create(&self, room: &Room) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "INSERT INTO rooms (id, code, name, capacity, building, floor, department_id, status, responsible, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                room.id.to_string(),
                room.code,
                room.name,
                room.capacity,
                room.building,
                room.floor,
                room.department_id.to_string(),
                Self::status_to_str(room.status),
                room.responsible.map(|id| id.to_string()),
                room.description,
                room.created_at.to_rfc3339(),
                room.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation => {
                DbError::ConstraintViolation(format!("room code already in use: {}", room.code))
            }
            other => other.into(),
        })?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Id) -> Result<Option<Room>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM rooms WHERE id = ?", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([id.to_string()], Self::row_to_room).ok())
    }

    pub fn find_all(&self, limit: u32, offset: u32) -> Result<Vec<Room>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM rooms ORDER BY building, floor, code LIMIT ? OFFSET ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([limit, offset], Self::row_to_room)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rooms)
    }

    pub fn find_by_department(&self, department_id: Id) -> Result<Vec<Room>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM rooms WHERE department_id = ? ORDER BY code",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([department_id.to_string()], Self::row_to_room)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rooms)
    }

    pub fn update(&self, room: &Room) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "UPDATE rooms SET name = ?, capacity = ?, building = ?, floor = ?, status = ?, responsible = ?, description = ?, updated_at = ?
             WHERE id = ?",
            params![
                room.name,
                room.capacity,
                room.building,
                room.floor,
                Self::status_to_str(room.status),
                room.responsible.map(|id| id.to_string()),
                room.description,
                room.updated_at.to_rfc3339(),
                room.id.to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: Id) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute("DELETE FROM rooms WHERE id = ?", [id.to_string()])?;
        Ok(())
    }
}
