use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use odens_core::{OdensSettings, TeamColor};

use crate::commands::{
    run::run, test_game::test_game, test_referee::test_referee, test_vision::test_vision,
};

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the control loop. This is the default.
    #[clap(name = "run")]
    Run,

    /// Print vision frames, mapped and estimated.
    #[clap(name = "test-vision")]
    TestVision,

    /// Print referee packets once per second.
    #[clap(name = "test-referee")]
    TestReferee,

    /// Print the play mode decided from referee packets.
    #[clap(name = "test-game")]
    TestGame,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Color {
    Blue,
    Yellow,
}

impl From<Color> for TeamColor {
    fn from(val: Color) -> Self {
        match val {
            Color::Blue => TeamColor::Blue,
            Color::Yellow => TeamColor::Yellow,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AttackDirection {
    /// Towards positive vision x.
    Right,
    Left,
}

#[derive(Debug, Parser)]
#[command(name = "odens")]
pub struct Cli {
    #[clap(subcommand)]
    command: Option<Command>,

    #[clap(long, short = 'f', default_value = "odens-settings.json")]
    pub settings_file: PathBuf,

    /// Our team colour, overrides the settings file.
    #[clap(long, short)]
    pub color: Option<Color>,

    /// Our robot slot, overrides the settings file.
    #[clap(long, short)]
    pub number: Option<usize>,

    /// Vision quadrant of our field, overrides the settings file.
    #[clap(long, short)]
    pub quadrant: Option<usize>,

    #[clap(long)]
    pub attack: Option<AttackDirection>,

    /// Ignore the referee box and play as if NORMAL_START was given.
    #[clap(long, default_value = "false", action)]
    pub no_referee: bool,

    /// Write a match log to the log directory.
    #[clap(long, default_value = "false", action)]
    pub match_log: bool,

    #[clap(long, default_value = "info")]
    pub log_level: String,

    #[clap(long, default_value = "logs")]
    pub log_directory: String,
}

impl Cli {
    pub async fn start(self) -> ExitCode {
        let settings = match self.settings() {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("Invalid settings: {:#}", err);
                return ExitCode::FAILURE;
            }
        };

        let result = match self.command.clone().unwrap_or(Command::Run) {
            Command::Run => match self.ensure_log_dir_path().await {
                Ok(log_directory) => run(settings, log_directory).await,
                Err(err) => Err(err),
            },
            Command::TestVision => test_vision(settings).await,
            Command::TestReferee => test_referee(settings).await,
            Command::TestGame => test_game(settings).await,
        };

        match result {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!("{:#}", err);
                ExitCode::FAILURE
            }
        }
    }

    /// Loads the settings file (creating it with defaults if missing) and applies the
    /// command line overrides.
    pub fn settings(&self) -> Result<OdensSettings> {
        let mut settings = OdensSettings::load_or_insert(&self.settings_file)?;
        if let Some(color) = self.color {
            settings.my_color = color.into();
        }
        if let Some(number) = self.number {
            settings.my_number = number;
        }
        if let Some(quadrant) = self.quadrant {
            settings.quadrant = quadrant;
        }
        if let Some(attack) = self.attack {
            settings.attack_right = matches!(attack, AttackDirection::Right);
        }
        if self.no_referee {
            settings.referee_enabled = false;
        }
        if self.match_log {
            settings.match_log = true;
        }
        settings
            .validate()
            .context("Invalid command line overrides")?;
        Ok(settings)
    }

    /// Returns the path to the log directory, making sure it exists. Defaults to "logs" in the current directory.
    pub async fn ensure_log_dir_path(&self) -> Result<PathBuf> {
        let path = PathBuf::from(&self.log_directory);
        tokio::fs::create_dir_all(&path)
            .await
            .with_context(|| format!("Failed to create log directory {}", path.display()))?;
        Ok(path)
    }
}
