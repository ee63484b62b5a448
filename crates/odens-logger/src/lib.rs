mod log_codec;
mod logger;

pub use log_codec::*;
pub use logger::*;
use odens_core::{GameMode, RefereeCommand, TeamFieldState, VelocityEstimate};
use serde::{Deserialize, Serialize};

/// Everything the controller knew and decided in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Controller time, seconds.
    pub time: f64,
    /// Estimated field state.
    pub field: TeamFieldState,
    pub ball_velocity: VelocityEstimate,
    /// Latest referee command, if a referee packet was ever received.
    pub referee_command: Option<RefereeCommand>,
    pub mode: GameMode,
}
