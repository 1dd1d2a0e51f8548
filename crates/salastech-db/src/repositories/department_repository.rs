//! Department repository

use rusqlite::{params, Row};
use salastech_core::{Department, Id};

use crate::{Database, DbError, Result};

pub struct DepartmentRepository {
    db: Database,
}

impl DepartmentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_department(row: &Row) -> rusqlite::Result<Department> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let code: String = row.get(2)?;
        let manager_id: Option<String> = row.get(3)?;
        let created_at: String = row.get(4)?;
        let updated_at: String = row.get(5)?;

        Ok(Department {
            id: Id::parse_str(&id).unwrap_or_else(|_| Id::new_v4()),
            name,
            code,
            manager_id: manager_id.and_then(|s| Id::parse_str(&s).ok()),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    const COLUMNS: &'static str = "id, name, code, manager_id, created_at, updated_at";

    pub fn create(&self, dept: &Department) -> Result<()> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute(
            "INSERT INTO departments (id, name, code, manager_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                dept.id.to_string(),
                dept.name,
                dept.code,
                dept.manager_id.map(|id| id.to_string()),
                dept.created_at.to_rfc3339(),
                dept.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: Id) -> Result<Option<Department>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM departments WHERE id = ?", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        Ok(stmt.query_row([id.to_string()], Self::row_to_department).ok())
    }

    pub fn find_all(&self) -> Result<Vec<Department>> {
        let conn = self.db.connection();
        let conn = conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let sql = format!("SELECT {} FROM departments ORDER BY name", Self::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let depts = stmt
            .query_map([], Self::row_to_department)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(depts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_find_round_trips() {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        let repo = DepartmentRepository::new(db);
        let dept = Department::new("Engineering".into(), "ENG".into());
        repo.create(&dept).unwrap();
        let found = repo.find_by_id(dept.id).unwrap().unwrap();
        assert_eq!(found.code, "ENG");
    }
}
