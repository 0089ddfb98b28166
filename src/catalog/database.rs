//! SQLite catalog database with migrations
//!
//! Holds the scraped course rows and the derived prerequisite edge table.
//! The scraper that populates it runs out of process; this side only needs
//! short read transactions plus an upsert path for dump ingestion.

use crate::error::{AdvisrError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

/// Database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Catalog database with migration support
pub struct CatalogDb {
    pool: DbPool,
}

impl CatalogDb {
    /// Open (or create) the catalog database at the given path
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AdvisrError::Io {
                source: e,
                context: format!("Failed to create database directory: {:?}", parent),
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path);

        let pool = Pool::builder()
            .max_size(16)
            .build(manager)
            .map_err(AdvisrError::Pool)?;

        {
            let conn = pool.get().map_err(AdvisrError::Pool)?;

            // WAL mode for concurrent readers
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
        }

        let db = Self { pool };
        db.migrate()?;

        Ok(db)
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(AdvisrError::Pool)
    }

    /// Run database migrations
    fn migrate(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM _migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (version, migration) in MIGRATIONS.iter().enumerate() {
            let version = version as i32 + 1;

            if version > current_version {
                tracing::info!("Applying catalog migration {}", version);

                conn.execute_batch(migration)?;

                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, datetime('now'))",
                    params![version],
                )?;
            }
        }

        Ok(())
    }

    /// Get catalog statistics
    pub fn stats(&self) -> Result<CatalogStats> {
        let conn = self.get_conn()?;

        let course_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM courses", [], |row| row.get(0))?;

        let edge_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM prereq_edges", [], |row| row.get(0))?;

        let placeholder_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM courses WHERE title LIKE 'Placeholder for%' OR title = 'N/A'",
            [],
            |row| row.get(0),
        )?;

        Ok(CatalogStats {
            course_count: course_count as usize,
            edge_count: edge_count as usize,
            placeholder_count: placeholder_count as usize,
        })
    }
}

/// Catalog statistics
#[derive(Debug)]
pub struct CatalogStats {
    pub course_count: usize,
    pub edge_count: usize,
    pub placeholder_count: usize,
}

/// Database migrations (each string is one migration)
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Courses scraped from the calendar
    CREATE TABLE courses (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        credits REAL NOT NULL DEFAULT 0,
        department TEXT NOT NULL DEFAULT '',
        offered_fall INTEGER NOT NULL DEFAULT 0,
        offered_winter INTEGER NOT NULL DEFAULT 0,
        offered_summer INTEGER NOT NULL DEFAULT 0,
        prereq_text TEXT NOT NULL DEFAULT '',
        coreq_text TEXT NOT NULL DEFAULT ''
    );

    CREATE INDEX idx_courses_department ON courses(department);

    -- Derived prerequisite edges; may lag behind prereq_text
    CREATE TABLE prereq_edges (
        src_course_id TEXT NOT NULL REFERENCES courses(id),
        dst_course_id TEXT NOT NULL REFERENCES courses(id),
        kind TEXT NOT NULL,
        PRIMARY KEY (src_course_id, dst_course_id, kind)
    );

    CREATE INDEX idx_prereq_edges_src ON prereq_edges(src_course_id);
    CREATE INDEX idx_prereq_edges_dst ON prereq_edges(dst_course_id);
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let _db = CatalogDb::open(&db_path).unwrap();
        assert!(db_path.exists());
    }

    #[test]
    fn test_migrations_applied() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = CatalogDb::open(&db_path).unwrap();

        let conn = db.get_conn().unwrap();
        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM _migrations", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, MIGRATIONS.len() as i32);
    }

    #[test]
    fn test_schema_exists() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = CatalogDb::open(&db_path).unwrap();
        let conn = db.get_conn().unwrap();

        for table in ["courses", "prereq_edges"] {
            let count: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(count, 1, "Table {} should exist", table);
        }
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        {
            let _db = CatalogDb::open(&db_path).unwrap();
        }
        // Second open must not re-run migrations
        let db = CatalogDb::open(&db_path).unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.course_count, 0);
        assert_eq!(stats.edge_count, 0);
    }
}
