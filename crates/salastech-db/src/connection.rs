//! Database connection management

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::{DbError, Result};

/// Database connection wrapper
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    initialized: bool,
}

impl Database {
    /// Open or create a database at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            initialized: false,
        })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            initialized: false,
        })
    }

    /// Initialize the database with the schema
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let schema = include_str!("schema.sql");
        let conn = self.conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        conn.execute_batch(schema)?;

        drop(conn);
        self.initialized = true;
        Ok(())
    }

    /// Get a connection for executing queries
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Check if a table exists
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?")?;
        let exists = stmt.exists([table_name])?;
        Ok(exists)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn.lock().map_err(|e| DbError::Connection(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT COUNT(*) FROM users")?;
        let user_count: i64 = stmt.query_row([], |row| row.get(0)).unwrap_or(0);

        let mut stmt = conn.prepare("SELECT COUNT(*) FROM rooms")?;
        let room_count: i64 = stmt.query_row([], |row| row.get(0)).unwrap_or(0);

        let mut stmt = conn.prepare("SELECT COUNT(*) FROM reservations WHERE archived_at IS NULL")?;
        let reservation_count: i64 = stmt.query_row([], |row| row.get(0)).unwrap_or(0);

        let mut stmt = conn.prepare(
            "SELECT COUNT(*) FROM reservations WHERE status = 'PENDING' AND archived_at IS NULL",
        )?;
        let pending_count: i64 = stmt.query_row([], |row| row.get(0)).unwrap_or(0);

        Ok(DatabaseStats {
            user_count,
            room_count,
            reservation_count,
            pending_count,
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            initialized: self.initialized,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub user_count: i64,
    pub room_count: i64,
    pub reservation_count: i64,
    pub pending_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        assert!(db.table_exists("users").unwrap());
        assert!(db.table_exists("reservations").unwrap());
    }

    #[test]
    fn test_stats() {
        let mut db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.user_count, 0);
        assert_eq!(stats.reservation_count, 0);
    }
}
