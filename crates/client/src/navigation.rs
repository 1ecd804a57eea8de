//! Navigation seam used for login redirects.

use std::sync::Mutex;

/// Where the user currently is, and how to send them elsewhere.
///
/// A browser shell maps this onto its router; the CLI and tests use
/// [`MemoryNavigator`].
pub trait Navigator: Send + Sync {
    /// Current location path, e.g. `/dashboard`.
    fn current_location(&self) -> String;

    /// Force navigation to `path`.
    fn navigate(&self, path: &str);
}

/// Navigator that keeps the location in memory and records every move.
#[derive(Debug)]
pub struct MemoryNavigator {
    inner: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    location: String,
    history: Vec<String>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(NavState {
                location: start.into(),
                history: Vec::new(),
            }),
        }
    }

    /// Every path passed to [`Navigator::navigate`], oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NavState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn current_location(&self) -> String {
        self.lock().location.clone()
    }

    fn navigate(&self, path: &str) {
        tracing::info!(to = %path, "Navigating");
        let mut state = self.lock();
        state.location = path.to_string();
        state.history.push(path.to_string());
    }
}
