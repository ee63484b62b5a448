//! Field dimensions of the humanoid league field, in millimetres.

/// Field width (touch line to touch line) \[mm]
pub const FIELD_WIDTH: f64 = 3005.0;
/// Field length (goal line to goal line) \[mm]
pub const FIELD_LENGTH: f64 = 4505.0;
/// Half of [`FIELD_WIDTH`] \[mm]
pub const FIELD_WIDTH2: f64 = FIELD_WIDTH / 2.0;
/// Half of [`FIELD_LENGTH`] \[mm]
pub const FIELD_LENGTH2: f64 = FIELD_LENGTH / 2.0;
/// Goal area width (along the goal line) \[mm]
pub const GOAL_AREA_WIDTH: f64 = 1600.0;
/// Goal area length (into the field) \[mm]
pub const GOAL_AREA_LENGTH: f64 = 600.0;

/// Number of vision quadrants.
pub const QUADRANT_COUNT: usize = 4;

const QUADRANT_X_ORIGIN: [f64; QUADRANT_COUNT] =
    [FIELD_LENGTH2, -FIELD_LENGTH2, -FIELD_LENGTH2, FIELD_LENGTH2];
const QUADRANT_Y_ORIGIN: [f64; QUADRANT_COUNT] =
    [FIELD_WIDTH2, FIELD_WIDTH2, -FIELD_WIDTH2, -FIELD_WIDTH2];

/// Origin of the team field frame expressed in vision coordinates when the field
/// occupies the given vision quadrant (0..=3 for the first to fourth quadrant).
///
/// Returns `None` for an out-of-range quadrant.
pub fn quadrant_origin(quadrant: usize) -> Option<(f64, f64)> {
    if quadrant >= QUADRANT_COUNT {
        return None;
    }
    Some((QUADRANT_X_ORIGIN[quadrant], QUADRANT_Y_ORIGIN[quadrant]))
}
