use odens_core::{GameMode, GameSettings, KickType, PlayType, Pose2D, RefereeCommand, TeamColor};

/// Decides the team's play mode from referee commands and ball movement.
///
/// The kick type announced by a prepare or free-kick command is latched and carried
/// into the following set play. A set play ends on its own when it has lasted too
/// long, or when the opponent has touched the ball.
#[derive(Debug, Clone)]
pub struct GameModeDecider {
    our_color: TeamColor,
    settings: GameSettings,
    prev_play: PlayType,
    latched_kick: KickType,
    anchor_ball: Pose2D,
    anchor_time: f64,
}

impl GameModeDecider {
    pub fn new(our_color: TeamColor, settings: GameSettings) -> Self {
        Self {
            our_color,
            settings,
            prev_play: PlayType::None,
            latched_kick: KickType::None,
            anchor_ball: Pose2D::invisible(),
            anchor_time: 0.0,
        }
    }

    pub fn our_color(&self) -> TeamColor {
        self.our_color
    }

    pub fn previous_play(&self) -> PlayType {
        self.prev_play
    }

    pub fn update_settings(&mut self, settings: GameSettings) {
        self.settings = settings;
    }

    /// Decide the mode for the current tick from the latest referee command, the
    /// estimated ball pose and the current time in seconds.
    pub fn decide(&mut self, command: RefereeCommand, ball: &Pose2D, now: f64) -> GameMode {
        let mut mode = self.apply_command(command);

        if mode.play == PlayType::SetPlay {
            if self.prev_play != PlayType::SetPlay {
                self.anchor_ball = *ball;
                self.anchor_time = now;
            } else if now - self.anchor_time > self.settings.set_play_timeout {
                log::info!("Set play timed out, switching to in play");
                mode = self.end_set_play();
            } else {
                if self.anchor_ball.is_invisible() && ball.is_visible() {
                    // The ball was not seen when the set play started.
                    self.anchor_ball = *ball;
                }
                let moved = self
                    .anchor_ball
                    .visible()
                    .zip(ball.visible())
                    .and_then(|(anchor, ball)| ball.distance(anchor))
                    .is_some_and(|d| d > self.settings.ball_moved_distance);
                if mode.kick.is_theirs() && moved {
                    log::info!(
                        "Ball moved during {}, switching to in play",
                        mode.kick.as_str()
                    );
                    mode = self.end_set_play();
                }
            }
        }

        if mode.play != self.prev_play {
            log::debug!(
                "Play mode {} -> {}",
                self.prev_play.as_str(),
                mode.play.as_str()
            );
        }
        self.prev_play = mode.play;
        mode
    }

    fn end_set_play(&mut self) -> GameMode {
        self.latched_kick = KickType::None;
        GameMode::new(PlayType::InPlay, KickType::None)
    }

    fn latch(&mut self, ours: KickType, theirs: KickType, team: TeamColor) -> KickType {
        self.latched_kick = if team == self.our_color { ours } else { theirs };
        self.latched_kick
    }

    fn apply_command(&mut self, command: RefereeCommand) -> GameMode {
        match command {
            RefereeCommand::Halt => GameMode::new(PlayType::Halt, KickType::None),
            RefereeCommand::Stop => GameMode::new(PlayType::OutOfPlay, KickType::None),
            RefereeCommand::NormalStart => {
                let play = if self.prev_play == PlayType::InPlay {
                    PlayType::InPlay
                } else {
                    PlayType::SetPlay
                };
                GameMode::new(play, self.latched_kick)
            }
            RefereeCommand::ForceStart => GameMode::new(PlayType::InPlay, KickType::None),
            RefereeCommand::PrepareKickoff(team) => {
                let kick = self.latch(KickType::OurKickOff, KickType::TheirKickOff, team);
                GameMode::new(PlayType::PreSetPlay, kick)
            }
            RefereeCommand::PreparePenalty(team) => {
                let kick = self.latch(KickType::OurPenaltyKick, KickType::TheirPenaltyKick, team);
                GameMode::new(PlayType::PreSetPlay, kick)
            }
            RefereeCommand::DirectFree(team) => {
                self.free_kick(KickType::OurDirectFreeKick, KickType::TheirDirectFreeKick, team)
            }
            RefereeCommand::IndirectFree(team) => {
                self.free_kick(KickType::OurIndirectFreeKick, KickType::TheirIndirectFreeKick, team)
            }
            RefereeCommand::Timeout(_) | RefereeCommand::Goal(_) => {
                GameMode::new(self.prev_play, KickType::None)
            }
        }
    }

    /// A free kick called while the ball is already in play does not interrupt it.
    fn free_kick(&mut self, ours: KickType, theirs: KickType, team: TeamColor) -> GameMode {
        if self.prev_play == PlayType::InPlay {
            GameMode::new(PlayType::InPlay, self.latched_kick)
        } else {
            let kick = self.latch(ours, theirs, team);
            GameMode::new(PlayType::SetPlay, kick)
        }
    }
}
