//! Turn-processing core of the FitBot coach: leveling, tag extraction, badge
//! evaluation and the orchestrator that ties them to the model and storage.

pub mod badges;
pub mod error;
pub mod leveling;
pub mod model;
pub mod ports;
pub mod prompt;
pub mod rewards;
pub mod tags;
pub mod turn;

pub use error::TurnError;
pub use leveling::LevelLadder;
pub use rewards::GamificationConfig;
pub use turn::TurnEngine;
