use std::sync::Arc;

use crate::session::store::SessionStore;
use crate::session::workflow::WorkflowController;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    /// Owns the analysis service. Swap the service for a fake in tests.
    pub controller: Arc<WorkflowController>,
}
