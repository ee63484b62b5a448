//! Turns raw vision frames and referee commands into the team's view of the match:
//! a mapped and smoothed field state, a ball velocity and a play mode.

mod estimator;
mod game;
mod mapper;
mod velocity;

pub use estimator::Estimator;
pub use game::GameModeDecider;
pub use mapper::{MappedFrame, VisionMapper};
pub use velocity::BallVelocityFit;
