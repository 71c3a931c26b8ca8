//! SQLite-backed store

use super::PageStore;
use crate::error::Result;
use crate::model::{Domain, PageRecord, ScriptArtifact, TestCaseSpec};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;

        ::log::info!("Opened database at {:?}", path.as_ref());
        Ok(store)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS domain (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS page (
                url TEXT PRIMARY KEY,
                domain_id INTEGER NOT NULL REFERENCES domain(id),
                title TEXT NOT NULL DEFAULT '',
                source TEXT NOT NULL,
                content_hash TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                test_cases TEXT NOT NULL DEFAULT '[]',
                test_cases_count INTEGER NOT NULL DEFAULT 0,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_page_domain ON page(domain_id);

            -- One row per (page, test case); spec_key is the canonical spec JSON
            CREATE TABLE IF NOT EXISTS test_case_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                page_url TEXT NOT NULL,
                spec_key TEXT NOT NULL,
                test_case_name TEXT NOT NULL,
                test_case_type TEXT NOT NULL,
                source_text TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(page_url, spec_key)
            );
            "#,
        )?;

        Ok(())
    }
}

impl PageStore for SqliteStore {
    fn page(&self, url: &str) -> Result<Option<PageRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT domain_id, title, source, content_hash, metadata, test_cases,
                        test_cases_count, timestamp
                 FROM page WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                        row.get::<_, DateTime<Local>>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((domain_id, title, source, content_hash, metadata, test_cases, count, timestamp)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(PageRecord {
            url: url.to_string(),
            domain_id,
            title,
            source,
            content_hash,
            metadata: serde_json::from_str(&metadata)?,
            test_cases: serde_json::from_str(&test_cases)?,
            test_cases_count: count.max(0) as usize,
            timestamp,
        }))
    }

    fn upsert_page(&self, record: &PageRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO page (url, domain_id, title, source, content_hash, metadata,
                               test_cases, test_cases_count, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(url) DO UPDATE SET
                domain_id = excluded.domain_id,
                title = excluded.title,
                source = excluded.source,
                content_hash = excluded.content_hash,
                metadata = excluded.metadata,
                test_cases = excluded.test_cases,
                test_cases_count = excluded.test_cases_count,
                timestamp = excluded.timestamp",
            params![
                record.url,
                record.domain_id,
                record.title,
                record.source,
                record.content_hash,
                serde_json::to_string(&record.metadata)?,
                serde_json::to_string(&record.test_cases)?,
                record.test_cases_count as i64,
                record.timestamp,
            ],
        )?;
        ::log::debug!("Stored page record for {}", record.url);
        Ok(())
    }

    fn ensure_domain(&self, name: &str) -> Result<Domain> {
        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO domain (name) VALUES (?1)",
            params![name],
        )?;
        if inserted > 0 {
            ::log::info!("Created domain record: {}", name);
        }
        let id: i64 = conn.query_row(
            "SELECT id FROM domain WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(Domain {
            id,
            name: name.to_string(),
        })
    }

    fn find_script(&self, page_url: &str, spec: &TestCaseSpec) -> Result<Option<ScriptArtifact>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT test_case_name, test_case_type, source_text, storage_path
                 FROM test_case_data WHERE page_url = ?1 AND spec_key = ?2",
                params![page_url, spec.canonical_json()?],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(
            |(test_case_name, test_case_type, source_text, storage_path)| ScriptArtifact {
                page_url: page_url.to_string(),
                test_case_name,
                test_case_type,
                test_case_spec: spec.clone(),
                source_text,
                storage_path,
            },
        ))
    }

    fn save_script(&self, artifact: &ScriptArtifact) -> Result<()> {
        let now = Local::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO test_case_data (page_url, spec_key, test_case_name, test_case_type,
                                         source_text, storage_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(page_url, spec_key) DO UPDATE SET
                test_case_name = excluded.test_case_name,
                test_case_type = excluded.test_case_type,
                source_text = excluded.source_text,
                storage_path = excluded.storage_path,
                updated_at = excluded.updated_at",
            params![
                artifact.page_url,
                artifact.test_case_spec.canonical_json()?,
                artifact.test_case_name,
                artifact.test_case_type,
                artifact.source_text,
                artifact.storage_path,
                now,
            ],
        )?;
        Ok(())
    }
}
