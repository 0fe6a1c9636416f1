use super::domain::RunParameters;
use super::report::RosterReports;
use super::RosterError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a run: the uploaded bytes together with the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunKey(u64);

impl RunKey {
    pub fn new(input: &[u8], params: &RunParameters) -> Self {
        let mut hasher = DefaultHasher::new();
        input.hash(&mut hasher);
        params.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Most recent successful run, held by whoever serves the downloads.
///
/// A failed refresh leaves the previous reports in place.
#[derive(Debug, Default)]
pub struct ReportCache {
    last_good: Option<(RunKey, Arc<RosterReports>)>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<Arc<RosterReports>> {
        self.last_good.as_ref().map(|(_, reports)| Arc::clone(reports))
    }

    pub fn latest_key(&self) -> Option<RunKey> {
        self.last_good.as_ref().map(|(key, _)| *key)
    }

    pub fn get(&self, key: RunKey) -> Option<Arc<RosterReports>> {
        self.last_good
            .as_ref()
            .filter(|(cached, _)| *cached == key)
            .map(|(_, reports)| Arc::clone(reports))
    }

    pub fn store(&mut self, key: RunKey, reports: RosterReports) -> Arc<RosterReports> {
        let reports = Arc::new(reports);
        self.last_good = Some((key, Arc::clone(&reports)));
        reports
    }

    /// Returns the cached reports for `key`, or runs `generate` and remembers
    /// its output. Errors propagate without touching the cache.
    pub fn refresh<F>(&mut self, key: RunKey, generate: F) -> Result<Arc<RosterReports>, RosterError>
    where
        F: FnOnce() -> Result<RosterReports, RosterError>,
    {
        if let Some(reports) = self.get(key) {
            return Ok(reports);
        }
        let reports = generate()?;
        Ok(self.store(key, reports))
    }
}
