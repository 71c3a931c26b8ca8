//! Persistence of page analyses, domains and materialized scripts.
//!
//! The pipeline re-reads through this trait before every decision and never
//! assumes its own earlier writes are still current. Writes are
//! last-writer-wins.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{Domain, PageRecord, ScriptArtifact, TestCaseSpec};

pub trait PageStore: Send + Sync {
    /// Stored analysis for a normalized URL
    fn page(&self, url: &str) -> Result<Option<PageRecord>>;

    /// Inserts or overwrites the record keyed by `record.url`
    fn upsert_page(&self, record: &PageRecord) -> Result<()>;

    /// Domain named `name`, created when absent
    fn ensure_domain(&self, name: &str) -> Result<Domain>;

    /// Script previously materialized for this exact test case on this page
    fn find_script(&self, page_url: &str, spec: &TestCaseSpec) -> Result<Option<ScriptArtifact>>;

    /// Inserts, or updates in place the artifact with the same (page, spec)
    fn save_script(&self, artifact: &ScriptArtifact) -> Result<()>;
}
