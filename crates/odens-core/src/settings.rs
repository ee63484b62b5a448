use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{TeamColor, QUADRANT_COUNT, ROBOTS_PER_TEAM};

/// Tuning of the field state estimator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorSettings {
    /// How long a remembered ball pose stands in for an unseen ball, in seconds.
    pub ball_recency_window: f64,
    /// How long a remembered robot pose stands in for an unseen robot, in seconds.
    pub robot_recency_window: f64,
    /// Displacement between consecutive frames above which an identified robot
    /// observation is discarded as a glitch, in mm.
    pub robot_jump_threshold: f64,
    /// Length of the ball history used for the velocity fit, in seconds.
    pub velocity_window: f64,
    /// Minimum number of ball observations needed for a fit.
    pub velocity_min_points: usize,
    /// Fitted speeds below this are reported as a stationary ball, in mm/s.
    pub stationary_speed: f64,
    /// Distance between fitted and observed ball position counted as an outlier, in mm.
    pub fit_outlier_distance: f64,
    /// The ball history is dropped once more than this many consecutive outliers occur.
    pub fit_outlier_limit: u32,
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            ball_recency_window: 10.0,
            robot_recency_window: 1.0,
            robot_jump_threshold: 240.0,
            velocity_window: 1.0,
            velocity_min_points: 3,
            stationary_speed: 10.0,
            fit_outlier_distance: 100.0,
            fit_outlier_limit: 1,
        }
    }
}

/// Tuning of the game mode decider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// A set play turns into normal play after this long, in seconds.
    pub set_play_timeout: f64,
    /// Ball displacement from the set-play anchor that ends the opponent's set
    /// play, in mm.
    pub ball_moved_distance: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            set_play_timeout: 20.0,
            ball_moved_distance: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MulticastSettings {
    pub address: String,
    pub port: u16,
}

impl MulticastSettings {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

/// Settings of one robot controller instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdensSettings {
    pub my_color: TeamColor,
    /// Our own robot slot, `1..=ROBOTS_PER_TEAM`.
    pub my_number: usize,
    pub vision: MulticastSettings,
    pub referee_enabled: bool,
    pub referee: MulticastSettings,
    /// Vision quadrant our field occupies, `0..=3`.
    pub quadrant: usize,
    /// Whether we attack towards positive vision x.
    pub attack_right: bool,
    /// Marker ids of our robots, indexed by slot - 1.
    pub our_marker_table: [u32; ROBOTS_PER_TEAM],
    /// Marker ids of the opponent robots, indexed by slot - 1.
    pub their_marker_table: [u32; ROBOTS_PER_TEAM],
    /// Whether to write a match log.
    pub match_log: bool,
    pub estimator: EstimatorSettings,
    pub game: GameSettings,
}

impl Default for OdensSettings {
    fn default() -> Self {
        Self {
            my_color: TeamColor::Blue,
            my_number: 1,
            vision: MulticastSettings::new("224.5.23.2", 10006),
            referee_enabled: true,
            referee: MulticastSettings::new("224.5.23.1", 10003),
            quadrant: 0,
            attack_right: true,
            our_marker_table: [0, 1, 2],
            their_marker_table: [3, 4, 5],
            match_log: false,
            estimator: EstimatorSettings::default(),
            game: GameSettings::default(),
        }
    }
}

impl OdensSettings {
    /// Load the settings from a file, or store the default settings if the file does
    /// not exist.
    pub fn load_or_insert(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let settings: Self = serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse settings {}", path.display()))?;
                settings.validate()?;
                Ok(settings)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.store(path)?;
                log::info!("Wrote default settings to {}", path.display());
                Ok(settings)
            }
            Err(err) => {
                Err(err).with_context(|| format!("Failed to read settings {}", path.display()))
            }
        }
    }

    /// Store the settings in the given file.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write settings {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=ROBOTS_PER_TEAM).contains(&self.my_number) {
            bail!(
                "my_number must be in 1..={}, got {}",
                ROBOTS_PER_TEAM,
                self.my_number
            );
        }
        if self.quadrant >= QUADRANT_COUNT {
            bail!("quadrant must be in 0..{}, got {}", QUADRANT_COUNT, self.quadrant);
        }
        if self.estimator.velocity_min_points < 2 {
            bail!("estimator.velocity_min_points must be at least 2");
        }
        Ok(())
    }

    /// Marker tables as `(blue, yellow)`.
    pub fn marker_tables(&self) -> ([u32; ROBOTS_PER_TEAM], [u32; ROBOTS_PER_TEAM]) {
        match self.my_color {
            TeamColor::Blue => (self.our_marker_table, self.their_marker_table),
            TeamColor::Yellow => (self.their_marker_table, self.our_marker_table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_insert_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = OdensSettings::load_or_insert(&path).unwrap();
        assert_eq!(settings, OdensSettings::default());
        assert!(path.exists());

        let reloaded = OdensSettings::load_or_insert(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "my_color": "yellow", "my_number": 3 }"#).unwrap();
        let settings = OdensSettings::load_or_insert(&path).unwrap();
        assert_eq!(settings.my_color, TeamColor::Yellow);
        assert_eq!(settings.my_number, 3);
        assert_eq!(settings.vision.port, 10006);
        assert_eq!(settings.estimator.robot_jump_threshold, 240.0);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "quadrant": 4 }"#).unwrap();
        assert!(OdensSettings::load_or_insert(&path).is_err());
        fs::write(&path, "not json").unwrap();
        assert!(OdensSettings::load_or_insert(&path).is_err());
    }

    #[test]
    fn marker_tables_follow_color() {
        let mut settings = OdensSettings::default();
        assert_eq!(settings.marker_tables(), ([0, 1, 2], [3, 4, 5]));
        settings.my_color = TeamColor::Yellow;
        assert_eq!(settings.marker_tables(), ([3, 4, 5], [0, 1, 2]));
    }
}
