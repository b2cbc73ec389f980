//! Application state shared across request handlers.

use std::sync::Arc;

use bookd_engine::Engine;

/// Shared state: the engine owns the store, the collaborators, and the
/// secrets; handlers only ever talk to it.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        AppState { engine }
    }
}
