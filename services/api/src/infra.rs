use metrics_exporter_prometheus::PrometheusHandle;
use rollcall::workflows::roster::{
    ParameterSet, ReportCache, ReportFormat, RunPreset, WidthPolicy,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared by the roster endpoints. Uploads are serialized through the cache lock.
#[derive(Clone)]
pub(crate) struct RosterState {
    pub(crate) reports: Arc<Mutex<ReportCache>>,
    pub(crate) default_preset: RunPreset,
    pub(crate) max_students: u64,
}

impl RosterState {
    pub(crate) fn new(default_preset: RunPreset, max_students: u64) -> Self {
        Self {
            reports: Arc::new(Mutex::new(ReportCache::new())),
            default_preset,
            max_students,
        }
    }
}

pub(crate) fn parse_preset(raw: &str) -> Result<RunPreset, String> {
    raw.trim().parse()
}

pub(crate) fn parse_parameter_set(raw: &str) -> Result<ParameterSet, String> {
    raw.trim().parse()
}

pub(crate) fn parse_width_policy(raw: &str) -> Result<WidthPolicy, String> {
    raw.trim().parse()
}

pub(crate) fn parse_report_format(raw: &str) -> Result<ReportFormat, String> {
    raw.trim().parse()
}
