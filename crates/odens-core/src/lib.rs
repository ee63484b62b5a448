mod angle;
mod field;
mod field_state;
mod game_mode;
mod pose;
mod referee;
mod settings;
mod team_color;

pub use angle::*;
pub use field::*;
pub use field_state::*;
pub use game_mode::*;
pub use pose::*;
pub use referee::*;
pub use settings::*;
pub use team_color::*;

pub type Vector2 = nalgebra::Vector2<f64>;

/// Number of robots per team. Robot slots are numbered `1..=ROBOTS_PER_TEAM`, slot 0
/// is never used.
pub const ROBOTS_PER_TEAM: usize = 3;

/// Iterate over the valid robot slot numbers.
pub fn robot_slots() -> std::ops::RangeInclusive<usize> {
    1..=ROBOTS_PER_TEAM
}
