use std::collections::VecDeque;

use nalgebra::Matrix2;
use odens_core::{EstimatorSettings, Pose2D, Vector2, VelocityEstimate};

#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Vector2,
    time: f64,
}

/// Least-squares estimate of ball position and velocity over a sliding time window.
///
/// Fits `p(t) = v (t - now) + p0` to the buffered observations, so `p0` is the
/// position at the current time.
#[derive(Debug, Clone)]
pub struct BallVelocityFit {
    window: f64,
    min_points: usize,
    stationary_speed: f64,
    outlier_distance: f64,
    outlier_limit: u32,
    samples: VecDeque<Sample>,
    outliers: u32,
}

impl BallVelocityFit {
    pub fn new(settings: &EstimatorSettings) -> Self {
        let mut fit = Self {
            window: 0.0,
            min_points: 0,
            stationary_speed: 0.0,
            outlier_distance: 0.0,
            outlier_limit: 0,
            samples: VecDeque::new(),
            outliers: 0,
        };
        fit.update_settings(settings);
        fit
    }

    pub fn update_settings(&mut self, settings: &EstimatorSettings) {
        self.window = settings.velocity_window;
        self.min_points = settings.velocity_min_points.max(2);
        self.stationary_speed = settings.stationary_speed;
        self.outlier_distance = settings.fit_outlier_distance;
        self.outlier_limit = settings.fit_outlier_limit;
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.outliers = 0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Add the current observation (if visible) and return the estimated ball pose
    /// and velocity at `now`.
    pub fn update(&mut self, observed: &Pose2D, now: f64) -> (Pose2D, VelocityEstimate) {
        if let Some(position) = observed.position() {
            self.samples.push_back(Sample {
                position,
                time: now,
            });
        }
        while self
            .samples
            .front()
            .is_some_and(|sample| now - sample.time > self.window)
        {
            self.samples.pop_front();
        }

        let (position, velocity) = match self.samples.back().copied() {
            None => return (Pose2D::invisible(), VelocityEstimate::zero(now)),
            Some(last) if self.samples.len() < self.min_points => {
                (last.position, Vector2::zeros())
            }
            Some(_) => {
                let (position, velocity) = self.fit(now);
                self.track_outliers(&position, observed);
                (position, velocity)
            }
        };

        if self.outliers > self.outlier_limit {
            log::debug!("Ball fit diverged from observations, dropping history");
            self.clear();
        }

        (
            Pose2D::new(position.x, position.y, 0.0),
            VelocityEstimate { velocity, time: now },
        )
    }

    fn fit(&self, now: f64) -> (Vector2, Vector2) {
        let n = self.samples.len() as f64;
        let mut st = 0.0;
        let mut st2 = 0.0;
        let mut sp = Vector2::zeros();
        let mut stp = Vector2::zeros();
        for sample in &self.samples {
            let t = sample.time - now;
            st += t;
            st2 += t * t;
            sp += sample.position;
            stp += sample.position * t;
        }
        let mean = sp / n;

        // Normal equations for (p0, v): [n st; st st2] [p0; v] = [sp; stp]
        let normal = Matrix2::new(n, st, st, st2);
        let Some(inverse) = normal.try_inverse() else {
            return (mean, Vector2::zeros());
        };
        let solve = |s: f64, ts: f64| inverse * Vector2::new(s, ts);
        let x = solve(sp.x, stp.x);
        let y = solve(sp.y, stp.y);
        let position = Vector2::new(x[0], y[0]);
        let velocity = Vector2::new(x[1], y[1]);

        if velocity.norm() < self.stationary_speed {
            (mean, Vector2::zeros())
        } else {
            (position, velocity)
        }
    }

    fn track_outliers(&mut self, fitted: &Vector2, observed: &Pose2D) {
        match observed.position() {
            Some(observed) if (fitted - observed).norm() > self.outlier_distance => {
                self.outliers += 1;
            }
            _ => self.outliers = 0,
        }
    }
}
