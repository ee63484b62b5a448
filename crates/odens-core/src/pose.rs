use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    normalize_angle, Vector2, FIELD_LENGTH2, FIELD_WIDTH2, GOAL_AREA_LENGTH, GOAL_AREA_WIDTH,
};

/// Value stored in every component of a pose that is not currently known.
pub const INVISIBLE: f64 = 99999.0;

/// A planar pose: position in millimetres and orientation in radians.
///
/// A pose is either fully known or the sentinel, in which case all three components
/// equal [`INVISIBLE`]. Geometry against the sentinel is refused: the checked
/// accessors return `None` and log a warning.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::invisible()
    }
}

impl Pose2D {
    /// Create a pose. If any component equals [`INVISIBLE`] the whole pose collapses
    /// to the sentinel.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        if x == INVISIBLE || y == INVISIBLE || theta == INVISIBLE {
            Self::invisible()
        } else {
            Self { x, y, theta }
        }
    }

    pub const fn invisible() -> Self {
        Self {
            x: INVISIBLE,
            y: INVISIBLE,
            theta: INVISIBLE,
        }
    }

    pub fn is_invisible(&self) -> bool {
        self.x == INVISIBLE
    }

    pub fn is_visible(&self) -> bool {
        !self.is_invisible()
    }

    /// Turn this pose into the sentinel.
    pub fn vanish(&mut self) {
        *self = Self::invisible();
    }

    /// The pose itself, or `None` for the sentinel.
    pub fn visible(&self) -> Option<&Pose2D> {
        if self.is_invisible() {
            None
        } else {
            Some(self)
        }
    }

    /// The position as a vector, or `None` for the sentinel.
    pub fn position(&self) -> Option<Vector2> {
        self.visible().map(|p| Vector2::new(p.x, p.y))
    }

    /// Euclidean distance between two positions.
    pub fn distance(&self, other: &Pose2D) -> Option<f64> {
        let (a, b) = checked_pair(self, other, "distance")?;
        Some((a.x - b.x).hypot(a.y - b.y))
    }

    /// Distance from the origin.
    pub fn norm(&self) -> Option<f64> {
        let Some(p) = self.visible() else {
            log::warn!("Pose2D::norm called on an invisible pose");
            return None;
        };
        Some(p.x.hypot(p.y))
    }

    /// Direction from `origin` towards this pose, in (-pi, pi].
    pub fn angle_from(&self, origin: &Pose2D) -> Option<f64> {
        let (a, o) = checked_pair(self, origin, "angle_from")?;
        Some((a.y - o.y).atan2(a.x - o.x))
    }

    /// Direction from the origin towards this position.
    pub fn heading(&self) -> Option<f64> {
        let Some(p) = self.visible() else {
            log::warn!("Pose2D::heading called on an invisible pose");
            return None;
        };
        Some(p.y.atan2(p.x))
    }

    /// Express this pose in the frame whose origin and orientation are `frame`.
    pub fn transform(&self, frame: &Pose2D) -> Option<Pose2D> {
        let (p, f) = checked_pair(self, frame, "transform")?;
        let (sin, cos) = f.theta.sin_cos();
        let dx = p.x - f.x;
        let dy = p.y - f.y;
        Some(Pose2D {
            x: dx * cos + dy * sin,
            y: -dx * sin + dy * cos,
            theta: normalize_angle(p.theta - f.theta),
        })
    }

    /// Inverse of [`Pose2D::transform`]: take a pose expressed in `frame` back to the
    /// parent frame.
    pub fn inverse_transform(&self, frame: &Pose2D) -> Option<Pose2D> {
        let (p, f) = checked_pair(self, frame, "inverse_transform")?;
        let (sin, cos) = f.theta.sin_cos();
        Some(Pose2D {
            x: f.x + p.x * cos - p.y * sin,
            y: f.y + p.x * sin + p.y * cos,
            theta: normalize_angle(p.theta + f.theta),
        })
    }

    /// Whether the position lies on the field, lines included. The sentinel is never
    /// in the field.
    pub fn is_in_field(&self) -> bool {
        self.is_visible() && self.x.abs() <= FIELD_LENGTH2 && self.y.abs() <= FIELD_WIDTH2
    }

    /// Whether the position lies in the goal area we defend (negative x).
    pub fn is_in_our_goal_area(&self) -> bool {
        self.is_visible()
            && self.x <= -FIELD_LENGTH2 + GOAL_AREA_LENGTH
            && self.x >= -FIELD_LENGTH2
            && self.y.abs() <= GOAL_AREA_WIDTH / 2.0
    }

    /// Whether the position lies in the goal area we attack (positive x).
    pub fn is_in_their_goal_area(&self) -> bool {
        self.is_visible()
            && self.x >= FIELD_LENGTH2 - GOAL_AREA_LENGTH
            && self.x <= FIELD_LENGTH2
            && self.y.abs() <= GOAL_AREA_WIDTH / 2.0
    }
}

fn checked_pair<'a>(
    a: &'a Pose2D,
    b: &'a Pose2D,
    op: &str,
) -> Option<(&'a Pose2D, &'a Pose2D)> {
    match (a.visible(), b.visible()) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => {
            log::warn!("Pose2D::{} called with an invisible pose", op);
            None
        }
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.theta)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn partial_sentinel_collapses() {
        let p = Pose2D::new(10.0, INVISIBLE, 0.0);
        assert_eq!(p, Pose2D::invisible());
        assert!(p.is_invisible());
        assert!(Pose2D::default().is_invisible());
    }

    #[test]
    fn sentinel_refuses_geometry() {
        let s = Pose2D::invisible();
        let p = Pose2D::new(100.0, -50.0, 0.3);
        assert_eq!(s.distance(&p), None);
        assert_eq!(p.distance(&s), None);
        assert_eq!(s.norm(), None);
        assert_eq!(s.heading(), None);
        assert_eq!(p.angle_from(&s), None);
        assert_eq!(s.transform(&p), None);
        assert_eq!(p.inverse_transform(&s), None);
        assert_eq!(s.position(), None);
        assert!(!s.is_in_field());
    }

    #[test]
    fn test_distance_and_angle() {
        let a = Pose2D::new(0.0, 0.0, 0.0);
        let b = Pose2D::new(300.0, 400.0, 1.0);
        assert_relative_eq!(a.distance(&b).unwrap(), 500.0);
        assert_relative_eq!(b.norm().unwrap(), 500.0);
        assert_relative_eq!(b.angle_from(&a).unwrap(), (400.0f64).atan2(300.0));
        assert_relative_eq!(
            Pose2D::new(-1.0, 0.0, 0.0).heading().unwrap(),
            PI,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transform() {
        let frame = Pose2D::new(100.0, 0.0, PI / 2.0);
        let p = Pose2D::new(100.0, 200.0, PI / 2.0);
        let local = p.transform(&frame).unwrap();
        assert_relative_eq!(local.x, 200.0, epsilon = 1e-9);
        assert_relative_eq!(local.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(local.theta, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn transform_round_trip() {
        let frames = [
            Pose2D::new(0.0, 0.0, 0.0),
            Pose2D::new(-1200.0, 340.0, 2.9),
            Pose2D::new(55.5, -2000.0, -1.3),
            Pose2D::new(10.0, 10.0, PI),
        ];
        let poses = [
            Pose2D::new(1.0, 2.0, 0.1),
            Pose2D::new(-2250.0, 1500.0, -3.0),
            Pose2D::new(800.0, -15.0, PI),
        ];
        for frame in &frames {
            for p in &poses {
                let back = p
                    .transform(frame)
                    .and_then(|local| local.inverse_transform(frame))
                    .unwrap();
                assert_relative_eq!(back.x, p.x, epsilon = 1e-6);
                assert_relative_eq!(back.y, p.y, epsilon = 1e-6);
                assert_relative_eq!(
                    normalize_angle(back.theta - p.theta).abs(),
                    0.0,
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn field_predicates() {
        assert!(Pose2D::new(0.0, 0.0, 0.0).is_in_field());
        assert!(!Pose2D::new(FIELD_LENGTH2 + 1.0, 0.0, 0.0).is_in_field());
        assert!(Pose2D::new(-FIELD_LENGTH2 + 100.0, 0.0, 0.0).is_in_our_goal_area());
        assert!(!Pose2D::new(-FIELD_LENGTH2 + 100.0, 900.0, 0.0).is_in_our_goal_area());
        assert!(Pose2D::new(FIELD_LENGTH2 - 100.0, -700.0, 0.0).is_in_their_goal_area());
        assert!(!Pose2D::new(FIELD_LENGTH2 - 100.0, -700.0, 0.0).is_in_our_goal_area());
    }

    #[test]
    fn display_format() {
        assert_eq!(Pose2D::new(1.0, -2.5, 0.0).to_string(), "1 -2.5 0");
    }
}
