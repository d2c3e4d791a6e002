use std::sync::Arc;

use crate::evaluation::service::EvaluationService;
use crate::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<EvaluationService>,
    /// Per-session result sets and in-flight batch handles.
    pub sessions: SessionStore,
}
