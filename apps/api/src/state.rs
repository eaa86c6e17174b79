use std::sync::Arc;

use crate::progression::policy::ProgressionConfig;
use crate::progression::service::ProgressionService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Validated once at startup; the service holds the same `Arc`.
    pub policy: Arc<ProgressionConfig>,
    pub progression: ProgressionService,
}
