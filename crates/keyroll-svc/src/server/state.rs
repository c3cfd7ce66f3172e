//! Shared application state injected into every Axum handler.

use keyroll::KeyProfileRegistry;

/// Application state shared across all request handlers.
///
/// The registry is `Arc`-backed, so Axum can clone the state per request
/// without copying any key material.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    /// Configured key profiles and the default profile.
    pub registry: KeyProfileRegistry,
}

impl AppState {
    /// Create a new [`AppState`] around a populated registry.
    pub fn new(registry: KeyProfileRegistry) -> Self {
        Self { registry }
    }
}
