use crate::orchestrator::PromptQl;

/// Shared application state for the web server
pub struct AppState {
    pub promptql: PromptQl,
}

impl AppState {
    pub fn new(promptql: PromptQl) -> Self {
        Self { promptql }
    }
}
