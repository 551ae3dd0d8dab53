use std::sync::Arc;

use crate::analysis::AnalysisPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
    /// Upper bound on the request body for document uploads.
    pub max_upload_bytes: usize,
}
