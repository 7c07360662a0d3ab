//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Arena, ArenaHandle, RosterView};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
    pub roster: Arc<RosterView>,
}

impl AppState {
    /// Create the application state and the arena task it talks to.
    /// The caller is responsible for spawning the returned arena.
    pub fn new(config: Config) -> (Self, Arena) {
        let config = Arc::new(config);

        let (arena, handle, roster) = Arena::new(config.round_seconds);

        (
            Self {
                config,
                arena: handle,
                roster,
            },
            arena,
        )
    }
}
