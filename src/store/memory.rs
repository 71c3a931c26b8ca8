use super::PageStore;
use crate::error::Result;
use crate::model::{Domain, PageRecord, ScriptArtifact, TestCaseSpec};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    pages: HashMap<String, PageRecord>,
    domains: Vec<Domain>,
    scripts: HashMap<(String, TestCaseSpec), ScriptArtifact>,
}

/// Process-local store, used for dry runs and tests
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_count(&self) -> usize {
        self.inner.read().pages.len()
    }

    pub fn script_count(&self) -> usize {
        self.inner.read().scripts.len()
    }
}

impl PageStore for MemoryStore {
    fn page(&self, url: &str) -> Result<Option<PageRecord>> {
        Ok(self.inner.read().pages.get(url).cloned())
    }

    fn upsert_page(&self, record: &PageRecord) -> Result<()> {
        self.inner
            .write()
            .pages
            .insert(record.url.clone(), record.clone());
        Ok(())
    }

    fn ensure_domain(&self, name: &str) -> Result<Domain> {
        let mut inner = self.inner.write();
        if let Some(domain) = inner.domains.iter().find(|d| d.name == name) {
            return Ok(domain.clone());
        }
        let domain = Domain {
            id: inner.domains.len() as i64 + 1,
            name: name.to_string(),
        };
        inner.domains.push(domain.clone());
        Ok(domain)
    }

    fn find_script(&self, page_url: &str, spec: &TestCaseSpec) -> Result<Option<ScriptArtifact>> {
        Ok(self
            .inner
            .read()
            .scripts
            .get(&(page_url.to_string(), spec.clone()))
            .cloned())
    }

    fn save_script(&self, artifact: &ScriptArtifact) -> Result<()> {
        let key = (artifact.page_url.clone(), artifact.test_case_spec.clone());
        self.inner.write().scripts.insert(key, artifact.clone());
        Ok(())
    }
}
