//! Shared application state.

use snowball_progress::application::admin::AdminConsole;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Console bound to the configured progress record.
    pub console: AdminConsole,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(console: AdminConsole) -> Self {
        Self { console }
    }
}
