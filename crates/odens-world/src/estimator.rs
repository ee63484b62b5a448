use odens_core::{
    robot_slots, EstimatorSettings, Pose2D, TeamColor, TeamFieldState, VelocityEstimate,
    ROBOTS_PER_TEAM,
};

use crate::velocity::BallVelocityFit;

/// Last accepted observation of one tracked object.
#[derive(Debug, Clone, Copy)]
struct Track {
    pose: Pose2D,
    time: f64,
    identified: bool,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            pose: Pose2D::invisible(),
            time: 0.0,
            identified: false,
        }
    }
}

impl Track {
    /// Apply one observation. Returns the estimated pose and identity flag.
    ///
    /// An unseen object is reported at its last accepted pose while that pose is
    /// younger than `window`. A seen object replaces the memory unless it jumped
    /// further than `jump_threshold` from a recent, identified pose; such a jump is
    /// discarded for this frame.
    fn observe(
        &mut self,
        observed: Pose2D,
        identified: bool,
        now: f64,
        window: f64,
        jump_threshold: Option<f64>,
    ) -> (Pose2D, bool) {
        let recent = self.pose.is_visible() && now - self.time <= window;
        if observed.is_invisible() {
            return if recent {
                (self.pose, self.identified)
            } else {
                (Pose2D::invisible(), false)
            };
        }

        if let Some(threshold) = jump_threshold {
            if recent && self.identified {
                let jump = self.pose.distance(&observed).unwrap_or_default();
                if jump > threshold {
                    log::debug!("Discarding jump of {:.0} mm", jump);
                    return (self.pose, self.identified);
                }
            }
        }

        *self = Track {
            pose: observed,
            time: now,
            identified,
        };
        (observed, identified)
    }
}

/// Fuses successive observed field states into a stable estimate.
///
/// Keeps the last accepted pose of the ball and every robot slot so that objects
/// missing from a few frames do not vanish, and discards single-frame jumps of
/// identified robots.
#[derive(Debug, Clone)]
pub struct Estimator {
    settings: EstimatorSettings,
    ball: Track,
    robots: [[Track; ROBOTS_PER_TEAM + 1]; 2],
    ball_fit: BallVelocityFit,
}

impl Estimator {
    pub fn new(settings: EstimatorSettings) -> Self {
        Self {
            settings,
            ball: Track::default(),
            robots: [[Track::default(); ROBOTS_PER_TEAM + 1]; 2],
            ball_fit: BallVelocityFit::new(&settings),
        }
    }

    pub fn settings(&self) -> &EstimatorSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: EstimatorSettings) {
        self.settings = settings;
        self.ball_fit.update_settings(&settings);
    }

    /// Forget everything seen so far.
    pub fn reset(&mut self) {
        self.ball = Track::default();
        self.robots = [[Track::default(); ROBOTS_PER_TEAM + 1]; 2];
        self.ball_fit.clear();
    }

    /// Estimate ball and robot poses at time `now` (seconds) from the latest observed
    /// state.
    pub fn update(&mut self, observed: &TeamFieldState, now: f64) -> TeamFieldState {
        let mut estimate = TeamFieldState::new(observed.time);
        let (held, _) = self.update_ball(&observed.ball, now);
        estimate.ball = held;
        self.update_robots(observed, now, &mut estimate);
        estimate
    }

    /// Like [`Estimator::update`], but the ball position and velocity come from a
    /// least-squares fit over the recent ball observations.
    pub fn update_with_velocity(
        &mut self,
        observed: &TeamFieldState,
        now: f64,
    ) -> (TeamFieldState, VelocityEstimate) {
        let mut estimate = TeamFieldState::new(observed.time);
        let (_, (fitted, velocity)) = self.update_ball(&observed.ball, now);
        estimate.ball = fitted;
        self.update_robots(observed, now, &mut estimate);
        (estimate, velocity)
    }

    /// Feed the ball observation to both the held pose and the fit, so either
    /// update flavour can follow the other.
    fn update_ball(
        &mut self,
        observed: &Pose2D,
        now: f64,
    ) -> (Pose2D, (Pose2D, VelocityEstimate)) {
        // The ball carries no identity and is therefore never treated as a jump.
        let (held, _) = self.ball.observe(
            *observed,
            false,
            now,
            self.settings.ball_recency_window,
            None,
        );
        (held, self.ball_fit.update(observed, now))
    }

    fn update_robots(
        &mut self,
        observed: &TeamFieldState,
        now: f64,
        estimate: &mut TeamFieldState,
    ) {
        for color in TeamColor::ALL {
            for slot in robot_slots() {
                let track = &mut self.robots[color.index()][slot];
                let (pose, identified) = track.observe(
                    observed.robot(color, slot),
                    observed.is_identified(color, slot),
                    now,
                    self.settings.robot_recency_window,
                    Some(self.settings.robot_jump_threshold),
                );
                estimate.set_robot(color, slot, pose, identified);
            }
        }
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(EstimatorSettings::default())
    }
}
