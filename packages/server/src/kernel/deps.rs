//! Server dependencies (using traits for testability).
//!
//! Central dependency container handed to every route handler. External
//! services sit behind the library's trait seams so tests can swap them.

use std::sync::Arc;

use scholarly::{KnowledgeStore, SessionManager, WorkflowEngine};

/// Shared server dependencies.
#[derive(Clone)]
pub struct ServerDeps {
    pub engine: Arc<WorkflowEngine>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub sessions: Arc<SessionManager>,
}

impl ServerDeps {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        knowledge: Arc<dyn KnowledgeStore>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            engine,
            knowledge,
            sessions,
        }
    }
}
