use odens_core::{
    quadrant_origin, robot_slots, rotate_half_turn, ObservationFrame, OdensSettings, Pose2D,
    RobotDetection, TeamColor, TeamFieldState, QUADRANT_COUNT, ROBOTS_PER_TEAM,
};

/// Output of [`VisionMapper::map`].
#[derive(Debug, Clone, PartialEq)]
pub struct MappedFrame {
    /// One ball and identity-resolved robot slots, in the team frame.
    pub field: TeamFieldState,
    /// Every detection transformed into the team frame, in detection order.
    pub transformed: ObservationFrame,
}

/// Converts vision detections into the team frame and assigns robots to slots.
///
/// The team frame has its origin at the field centre with x pointing towards the goal
/// we attack.
#[derive(Debug, Clone)]
pub struct VisionMapper {
    quadrant: usize,
    origin: (f64, f64),
    attack_right: bool,
    marker_tables: [[u32; ROBOTS_PER_TEAM]; 2],
}

impl VisionMapper {
    pub fn new(
        quadrant: usize,
        attack_right: bool,
        blue_markers: [u32; ROBOTS_PER_TEAM],
        yellow_markers: [u32; ROBOTS_PER_TEAM],
    ) -> Self {
        let mut mapper = Self {
            quadrant: 0,
            origin: quadrant_origin(0).unwrap_or_default(),
            attack_right,
            marker_tables: [blue_markers, yellow_markers],
        };
        mapper.set_quadrant(quadrant);
        mapper
    }

    pub fn from_settings(settings: &OdensSettings) -> Self {
        let (blue, yellow) = settings.marker_tables();
        Self::new(settings.quadrant, settings.attack_right, blue, yellow)
    }

    pub fn quadrant(&self) -> usize {
        self.quadrant
    }

    /// Select the vision quadrant. Out-of-range values are ignored and the previous
    /// quadrant is kept.
    pub fn set_quadrant(&mut self, quadrant: usize) -> bool {
        match quadrant_origin(quadrant) {
            Some(origin) => {
                self.quadrant = quadrant;
                self.origin = origin;
                true
            }
            None => {
                log::error!(
                    "Invalid quadrant {} (expected 0..{}), keeping {}",
                    quadrant,
                    QUADRANT_COUNT,
                    self.quadrant
                );
                false
            }
        }
    }

    pub fn attack_right(&self) -> bool {
        self.attack_right
    }

    pub fn set_attack_right(&mut self, attack_right: bool) {
        self.attack_right = attack_right;
    }

    pub fn set_marker_table(&mut self, color: TeamColor, markers: [u32; ROBOTS_PER_TEAM]) {
        self.marker_tables[color.index()] = markers;
    }

    pub fn marker_table(&self, color: TeamColor) -> &[u32; ROBOTS_PER_TEAM] {
        &self.marker_tables[color.index()]
    }

    fn sign(&self) -> f64 {
        if self.attack_right {
            1.0
        } else {
            -1.0
        }
    }

    /// Transform a vision pose into the team frame. Balls have no orientation and get
    /// theta 0.
    pub fn to_team_frame(&self, pose: &Pose2D, is_ball: bool) -> Pose2D {
        if pose.is_invisible() {
            return Pose2D::invisible();
        }
        let sign = self.sign();
        let theta = if is_ball {
            0.0
        } else if self.attack_right {
            pose.theta
        } else {
            rotate_half_turn(pose.theta)
        };
        Pose2D::new(
            sign * (pose.x - self.origin.0),
            sign * (pose.y - self.origin.1),
            theta,
        )
    }

    /// Transform a frame into the team frame and resolve robot identities.
    pub fn map(&self, frame: &ObservationFrame) -> MappedFrame {
        let transformed = ObservationFrame {
            camera_id: frame.camera_id,
            frame_number: frame.frame_number,
            t_capture: frame.t_capture,
            balls: frame
                .balls
                .iter()
                .map(|ball| self.to_team_frame(ball, true))
                .collect(),
            robots_blue: self.transform_robots(&frame.robots_blue),
            robots_yellow: self.transform_robots(&frame.robots_yellow),
        };

        let mut field = TeamFieldState::new(frame.t_capture);
        field.ball = transformed
            .balls
            .first()
            .copied()
            .unwrap_or_else(Pose2D::invisible);
        for color in TeamColor::ALL {
            self.assign_slots(&mut field, color, transformed.robots(color));
        }

        MappedFrame { field, transformed }
    }

    fn transform_robots(&self, robots: &[RobotDetection]) -> Vec<RobotDetection> {
        robots
            .iter()
            .map(|robot| RobotDetection {
                marker: robot.marker,
                pose: self.to_team_frame(&robot.pose, false),
            })
            .collect()
    }

    /// Fill the slots of one team. Detections whose marker is in the table go to
    /// the matching slot (first detection wins); leftover detections fill the
    /// remaining slots in detection order.
    fn assign_slots(
        &self,
        field: &mut TeamFieldState,
        color: TeamColor,
        robots: &[RobotDetection],
    ) {
        let table = self.marker_table(color);
        let mut consumed = vec![false; robots.len()];
        let mut assigned = [false; ROBOTS_PER_TEAM + 1];

        for slot in robot_slots() {
            let marker = table[slot - 1];
            let found = robots
                .iter()
                .enumerate()
                .find(|(j, robot)| !consumed[*j] && robot.marker == Some(marker));
            if let Some((j, robot)) = found {
                field.set_robot(color, slot, robot.pose, true);
                consumed[j] = true;
                assigned[slot] = true;
            }
        }

        let mut leftovers = robots
            .iter()
            .zip(consumed.iter())
            .filter(|(_, consumed)| !**consumed)
            .map(|(robot, _)| robot);
        for slot in robot_slots().filter(|slot| !assigned[*slot]) {
            match leftovers.next() {
                Some(robot) => field.set_robot(color, slot, robot.pose, true),
                None => break,
            }
        }
    }
}
