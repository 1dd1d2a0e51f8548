//! Reservation repository and the Conflict Index.
//!
//! The Conflict Index is not a separate structure: it is the
//! `(room_id, status)` index on `reservations` plus the half-open overlap
//! predicate `start_at < ? AND end_at > ?`, always scoped to the active
//! status set and to non-archived rows.

use rusqlite::{params, Row};
use salastech_core::{Id, Reservation, ReservationStatus, Timestamp};

use crate::{Database, DbError, Result};

pub struct ReservationRepository {
    db: Database,
}

impl ReservationRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn status_to_str(s: ReservationStatus) -> &'static str {
        s.as_str()
    }

    fn row_to_reservation(row: &Row) -> rusqlite::Result<Reservation> {
        let id: String = row.get(0)?;
        let room_id: String = row.get(1)?;
        let user_id: String = row.get(2)?;
        let title: String = row.get(3)?;
        let description: Option<String> = row.get(4)?;
        let start_at: String = row.get(5)?;
        let end_at: String = row.get(6)?;
        let status: String = row.get(7)?;
        let approved_by: Option<String> = row.get(8)?;
        let approved_at: Option<String> = row.get(9)?;
        let auto_approved: i64 = row.get(10)?;
        let cancellation_reason: Option<String> = row.get(11)?;
        let reminded_at: Option<String> = row.get(12)?;
        let archived_at: Option<String> = row.get(13)?;
        let created_at: String = row.get(14)?;
        let updated_at: String = row.get(15)?;

        let parse = |s: &str| -> Timestamp {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now())
        };
        let parse_opt = |s: Option<String>| -> Option<Timestamp> { s.map(|s| parse(&s)) };

        Ok(Reservation {
            id: Id::parse_str(&id).unwrap_or_else(|_| Id::new_v4()),
            room_id: Id::parse_str(&room_id).unwrap_or_else(|_| Id::new_v4()),
            user_id: Id::parse_str(&user_id).unwrap_or_else(|_| Id::new_v4()),
            title,
            description,
            start_at: parse(&start_at),
            end_at: parse(&end_at),
            status: ReservationStatus::from_str_opt(&status).unwrap_or(ReservationStatus::Pending),
            approved_by: approved_by.and_then(|s| Id::parse_str(&s).ok()),
            approved_at: parse_opt(approved_at),
            auto_approved: auto_approved != 0,
            cancellation_reason,
            reminded_at: parse_opt(reminded_at),
            archived_at: parse_opt(archived_at),
            created_at: parse(&created_at),
            updated_at: parse(&updated_at),
        })
    }

    const COLUMNS: &'static str = "id, room_id, user_id, title, description, start_at, end_at, status, \
        approved_by, approved_at, auto_approved, cancellation_reason, reminded_at, archived_at, created_at, updated_at";

    pub fn create(&self, r: &Reservation) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "INSERT INTO reservations (id, room_id, user_id, title, description, start_at, end_at, status,
                approved_by, approved_at, auto_approved, cancellation_reason, reminded_at, archived_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                r.id.to_string(),
                r.room_id.to_string(),
                r.user_id.to_string(),
                r.title,
                r.description,
                r.start_at.to_rfc3339(),
                r.end_at.to_rfc3339(),
                Self::status_to_str(r.status),
                r.approved_by.map(|id| id.to_string()),
                r.approved_at.map(|t| t.to_rfc3339()),
                r.auto_approved as i64,
                r.cancellation_reason,
                r.reminded_at.map(|t| t.to_rfc3339()),
                r.archived_at.map(|t| t.to_rfc3339()),
                r.created_at.to_rfc3339(),
                r.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Id) -> Result<Option<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM reservations WHERE id = ?", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([id.to_string()], Self::row_to_reservation).ok())
    }

    /// Conflict Index query: active reservations on `room_id` overlapping
    /// `[start, end)`, optionally excluding one reservation (for update-in-place).
    pub fn find_conflicts(
        &self,
        room_id: Id,
        start: Timestamp,
        end: Timestamp,
        exclude_id: Option<Id>,
    ) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;

        let sql = format!(
            "SELECT {} FROM reservations
             WHERE room_id = ?
               AND archived_at IS NULL
               AND status IN ('PENDING', 'CONFIRMED', 'IN_PROGRESS')
               AND id != ?
               AND start_at < ?
               AND end_at > ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let exclude = exclude_id.unwrap_or_else(Id::nil);
        let conflicts = stmt
            .query_map(
                params![room_id.to_string(), exclude.to_string(), end.to_rfc3339(), start.to_rfc3339()],
                Self::row_to_reservation,
            )?
            .filter_map(|r| r.ok())
            .collect();
        Ok(conflicts)
    }

    pub fn find_by_room(&self, room_id: Id, include_archived: bool) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = if include_archived {
            format!("SELECT {} FROM reservations WHERE room_id = ? ORDER BY start_at", Self::COLUMNS)
        } else {
            format!(
                "SELECT {} FROM reservations WHERE room_id = ? AND archived_at IS NULL ORDER BY start_at",
                Self::COLUMNS
            )
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([room_id.to_string()], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// General-purpose listing for `GET /reservations`: every filter is
    /// optional, applied as an `AND` when present. Archived rows are always
    /// excluded — this is a live-data listing, not a history browse.
    #[allow(clippy::too_many_arguments)]
    pub fn find_filtered(
        &self,
        status: Option<ReservationStatus>,
        room_id: Option<Id>,
        user_id: Option<Id>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;

        let mut sql = format!("SELECT {} FROM reservations WHERE archived_at IS NULL", Self::COLUMNS);
        let mut clauses = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(s) = status {
            clauses.push("status = ?");
            values.push(Box::new(Self::status_to_str(s).to_string()));
        }
        if let Some(r) = room_id {
            clauses.push("room_id = ?");
            values.push(Box::new(r.to_string()));
        }
        if let Some(u) = user_id {
            clauses.push("user_id = ?");
            values.push(Box::new(u.to_string()));
        }
        if let Some(s) = start {
            clauses.push("end_at > ?");
            values.push(Box::new(s.to_rfc3339()));
        }
        if let Some(e) = end {
            clauses.push("start_at < ?");
            values.push(Box::new(e.to_rfc3339()));
        }
        for clause in &clauses {
            sql.push_str(" AND ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY start_at LIMIT ? OFFSET ?");
        values.push(Box::new(limit));
        values.push(Box::new(offset));

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let rows = stmt
            .query_map(params.as_slice(), Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn find_by_user(&self, user_id: Id, limit: u32, offset: u32) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM reservations WHERE user_id = ? AND archived_at IS NULL
             ORDER BY start_at DESC LIMIT ? OFFSET ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![user_id.to_string(), limit, offset], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// All active reservations whose `start_at` falls within `[from, to)`,
    /// used by the scheduler's `autoApprove`/`sendReminders`/`advanceStatuses` ticks.
    pub fn find_active_starting_between(&self, from: Timestamp, to: Timestamp) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM reservations WHERE archived_at IS NULL
             AND status IN ('PENDING', 'CONFIRMED')
             AND start_at >= ? AND start_at < ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![from.to_rfc3339(), to.to_rfc3339()], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn find_pending_older_than(&self, cutoff: Timestamp) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM reservations WHERE archived_at IS NULL AND status = 'PENDING' AND created_at < ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([cutoff.to_rfc3339()], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn find_in_progress_ending_before(&self, cutoff: Timestamp) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM reservations WHERE archived_at IS NULL AND status = 'IN_PROGRESS' AND end_at < ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([cutoff.to_rfc3339()], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn find_finished_before(&self, cutoff: Timestamp) -> Result<Vec<Reservation>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!(
            "SELECT {} FROM reservations WHERE archived_at IS NULL
             AND status IN ('FINISHED', 'CANCELLED') AND updated_at < ?",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([cutoff.to_rfc3339()], Self::row_to_reservation)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn update(&self, r: &Reservation) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "UPDATE reservations SET title = ?, description = ?, start_at = ?, end_at = ?, status = ?,
                approved_by = ?, approved_at = ?, auto_approved = ?, cancellation_reason = ?,
                reminded_at = ?, archived_at = ?, updated_at = ?
             WHERE id = ?",
            params![
                r.title,
                r.description,
                r.start_at.to_rfc3339(),
                r.end_at.to_rfc3339(),
                Self::status_to_str(r.status),
                r.approved_by.map(|id| id.to_string()),
                r.approved_at.map(|t| t.to_rfc3339()),
                r.auto_approved as i64,
                r.cancellation_reason,
                r.reminded_at.map(|t| t.to_rfc3339()),
                r.archived_at.map(|t| t.to_rfc3339()),
                r.updated_at.to_rfc3339(),
                r.id.to_string(),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use salastech_core::{Department, Room, User, Role};

    fn seeded_db() -> (Database, Id, Id) {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();

        let dept_repo = super::super::department_repository::DepartmentRepository::new(db.clone());
        let dept = Department::new("Eng".into(), "ENG".into());
        dept_repo.create(&dept).unwrap();

        let user_repo = super::super::user_repository::UserRepository::new(db.clone());
        let user = User::new("A".into(), "B".into(), "a@example.com".into(), "h".into(), Role::User, Some(dept.id));
        user_repo.create(&user).unwrap();

        let room_repo = super::super::room_repository::RoomRepository::new(db.clone());
        let room = Room::new("ENG-1".into(), "Room 1".into(), 10, "Main".into(), 1, dept.id);
        room_repo.create(&room).unwrap();

        (db, room.id, user.id)
    }

    #[test]
    fn overlapping_reservation_is_detected_as_conflict() {
        let (db, room_id, user_id) = seeded_db();
        let repo = ReservationRepository::new(db);

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let r = Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        repo.create(&r).unwrap();

        let conflicts = repo
            .find_conflicts(room_id, start + chrono::Duration::minutes(30), end + chrono::Duration::hours(1), None)
            .unwrap();
        assert_eq!(conflicts.len(), 1);

        let no_conflicts = repo.find_conflicts(room_id, end, end + chrono::Duration::hours(1), None).unwrap();
        assert!(no_conflicts.is_empty());
    }

    #[test]
    fn cancelled_reservation_does_not_conflict() {
        let (db, room_id, user_id) = seeded_db();
        let repo = ReservationRepository::new(db);

        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 14, 0, 0).unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 15, 0, 0).unwrap();
        let mut r = Reservation::new(room_id, user_id, "Sync".into(), None, start, end, ReservationStatus::Confirmed);
        r.cancel(None, end);
        repo.create(&r).unwrap();

        let conflicts = repo.find_conflicts(room_id, start, end, None).unwrap();
        assert!(conflicts.is_empty());
    }
}
