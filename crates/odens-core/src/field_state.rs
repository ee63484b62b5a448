use serde::{Deserialize, Serialize};

use crate::{robot_slots, Pose2D, TeamColor, Vector2, ROBOTS_PER_TEAM};

/// A single robot seen by the vision system.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RobotDetection {
    /// Marker id reported by vision, if any.
    pub marker: Option<u32>,
    pub pose: Pose2D,
}

/// One detection frame from one camera, in whatever coordinate frame it was
/// produced in (vision or team frame).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct ObservationFrame {
    pub camera_id: u32,
    pub frame_number: u32,
    /// Capture timestamp, seconds.
    pub t_capture: f64,
    /// Ball detections in detection order. Balls carry theta 0.
    pub balls: Vec<Pose2D>,
    pub robots_blue: Vec<RobotDetection>,
    pub robots_yellow: Vec<RobotDetection>,
}

impl ObservationFrame {
    pub fn robots(&self, color: TeamColor) -> &[RobotDetection] {
        match color {
            TeamColor::Blue => &self.robots_blue,
            TeamColor::Yellow => &self.robots_yellow,
        }
    }
}

type RobotTable<T> = [[T; ROBOTS_PER_TEAM + 1]; 2];

/// Ball and robot poses in the team frame.
///
/// Robots are stored per team colour in slots `1..=ROBOTS_PER_TEAM`; slot 0 exists
/// only so that slot numbers match jersey numbers and is never written.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct TeamFieldState {
    pub ball: Pose2D,
    robots: RobotTable<Pose2D>,
    identified: RobotTable<bool>,
    /// Capture or estimation time, seconds.
    pub time: f64,
}

impl Default for TeamFieldState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TeamFieldState {
    /// An empty state: every pose is the sentinel and no identity is known.
    pub fn new(time: f64) -> Self {
        Self {
            ball: Pose2D::invisible(),
            robots: [[Pose2D::invisible(); ROBOTS_PER_TEAM + 1]; 2],
            identified: [[false; ROBOTS_PER_TEAM + 1]; 2],
            time,
        }
    }

    /// Pose in the given slot, the sentinel for an out-of-range slot.
    pub fn robot(&self, color: TeamColor, slot: usize) -> Pose2D {
        if !is_valid_slot(slot) {
            return Pose2D::invisible();
        }
        self.robots[color.index()][slot]
    }

    pub fn is_identified(&self, color: TeamColor, slot: usize) -> bool {
        is_valid_slot(slot) && self.identified[color.index()][slot]
    }

    /// Store a robot pose. Writes to slot 0 or past the last slot are ignored.
    pub fn set_robot(&mut self, color: TeamColor, slot: usize, pose: Pose2D, identified: bool) {
        if !is_valid_slot(slot) {
            log::error!("Ignoring write to invalid robot slot {} ({})", slot, color);
            return;
        }
        self.robots[color.index()][slot] = pose;
        self.identified[color.index()][slot] = identified;
    }

    pub fn clear_robot(&mut self, color: TeamColor, slot: usize) {
        self.set_robot(color, slot, Pose2D::invisible(), false);
    }

    /// Iterate over `(slot, pose, identified)` for one team.
    pub fn robots(&self, color: TeamColor) -> impl Iterator<Item = (usize, Pose2D, bool)> + '_ {
        robot_slots().map(move |slot| {
            (
                slot,
                self.robots[color.index()][slot],
                self.identified[color.index()][slot],
            )
        })
    }
}

fn is_valid_slot(slot: usize) -> bool {
    (1..=ROBOTS_PER_TEAM).contains(&slot)
}

/// Estimated ball velocity in mm/s.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct VelocityEstimate {
    pub velocity: Vector2,
    /// Time the estimate was computed for, seconds.
    pub time: f64,
}

impl VelocityEstimate {
    pub fn zero(time: f64) -> Self {
        Self {
            velocity: Vector2::zeros(),
            time,
        }
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }
}
