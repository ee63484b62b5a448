use std::f64::consts::PI;

/// Wrap an angle in radians into (-pi, pi].
///
/// ```
/// # use odens_core::normalize_angle;
/// use std::f64::consts::PI;
/// assert_eq!(normalize_angle(-PI), PI);
/// ```
pub fn normalize_angle(angle: f64) -> f64 {
    let mut angle = angle % (2.0 * PI);
    if angle <= -PI {
        angle += 2.0 * PI;
    } else if angle > PI {
        angle -= 2.0 * PI;
    }
    angle
}

/// Wrap an angle in radians into [0, 2pi).
pub fn normalize_angle_2pi(angle: f64) -> f64 {
    let angle = angle % (2.0 * PI);
    if angle < 0.0 {
        angle + 2.0 * PI
    } else {
        angle
    }
}

/// Rotate an orientation by half a turn, staying inside (-pi, pi].
pub fn rotate_half_turn(angle: f64) -> f64 {
    if angle > 0.0 {
        normalize_angle(angle - PI)
    } else {
        normalize_angle(angle + PI)
    }
}
