//! Application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use warden_auth::{AccessGate, AuthService};
use warden_db::Database;

/// Handle used to render Prometheus metrics
pub type MetricsHandle = PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: Arc<AuthService>,
    pub gate: Arc<AccessGate>,
}

impl AppState {
    pub fn new(db: Database, auth: Arc<AuthService>, gate: Arc<AccessGate>) -> Self {
        Self { db, auth, gate }
    }
}
