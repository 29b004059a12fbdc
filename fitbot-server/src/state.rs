use std::sync::Arc;

use fitbot_core::TurnEngine;
use fitbot_core::ports::{ProfileStore, WorkoutHistory};

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: TurnEngine,
    pub profiles: Arc<dyn ProfileStore>,
    pub workouts: Arc<dyn WorkoutHistory>,
}
