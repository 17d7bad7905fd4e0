use std::sync::Mutex;

use tracing::warn;

/// Receives the application-wide "go back to the login entry point" signal
/// raised when a session can no longer be refreshed.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Only logs the navigation.
#[derive(Debug, Default)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&self, path: &str) {
        warn!(
            event_name = "client.session.ended",
            event_domain = "client",
            "Session ended; navigating to '{}'",
            path
        );
    }
}

/// Logs the navigation and remembers every path it was sent to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn was_redirected(&self) -> bool {
        !self.visited.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        LoggingNavigator.navigate(path);
        self.visited
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}
