use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;
use odens_core::{GameMode, OdensSettings, RefereeCommand, TeamFieldState};
use odens_logger::{MatchLogger, TickRecord};
use odens_ssl_client::{
    ChannelError, FrameGap, RefereeChannel, RefereePoll, VisionChannel, VisionPoll,
};
use odens_world::{Estimator, GameModeDecider, VisionMapper};

/// How long to wait before reopening a channel whose receive thread stopped.
pub const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// Tick period while there is no vision channel to wait on.
const IDLE_PERIOD: Duration = Duration::from_millis(100);

/// A channel that is reopened after a back-off when its receive thread stops.
struct Supervised<C> {
    name: &'static str,
    channel: Option<C>,
    retry_at: Option<Instant>,
}

impl<C> Supervised<C> {
    fn new(name: &'static str, channel: C) -> Self {
        Self {
            name,
            channel: Some(channel),
            retry_at: None,
        }
    }

    /// The running channel, restarting it with `start` if the back-off has passed.
    fn channel(&mut self, start: impl FnOnce() -> Result<C>) -> Option<&mut C> {
        if self.channel.is_none() && self.retry_at.map_or(true, |at| Instant::now() >= at) {
            match start() {
                Ok(channel) => {
                    log::info!("Restarted {} channel", self.name);
                    self.channel = Some(channel);
                    self.retry_at = None;
                }
                Err(err) => {
                    log::error!("Failed to restart {} channel: {:#}", self.name, err);
                    self.retry_at = Some(Instant::now() + RESTART_BACKOFF);
                }
            }
        }
        self.channel.as_mut()
    }

    fn close(&mut self, err: &ChannelError) {
        log::error!("{} channel stopped: {}", self.name, err);
        self.channel = None;
        self.retry_at = Some(Instant::now() + RESTART_BACKOFF);
    }
}

/// Everything the control loop owns: the network feeds, the vision mapper, the
/// estimator, the play mode decider and the optional match logger.
pub struct Controller {
    settings: OdensSettings,
    vision: Supervised<VisionChannel>,
    referee: Option<Supervised<RefereeChannel>>,
    mapper: VisionMapper,
    estimator: Estimator,
    decider: GameModeDecider,
    logger: Option<MatchLogger>,
    referee_command: Option<RefereeCommand>,
    mode: GameMode,
    epoch: Instant,
}

impl Controller {
    /// Open the vision and (if enabled) referee feeds and the match log.
    ///
    /// Failing to open any of them is fatal, the caller should abort startup.
    pub fn start(settings: OdensSettings, log_directory: &Path) -> Result<Self> {
        let vision = VisionChannel::start(&settings.vision.address, settings.vision.port)?;
        let referee = if settings.referee_enabled {
            Some(RefereeChannel::start(
                &settings.referee.address,
                settings.referee.port,
            )?)
        } else {
            log::info!("Referee disabled, playing as if NORMAL_START was given");
            None
        };
        let logger = if settings.match_log {
            Some(MatchLogger::start(
                log_directory,
                settings.my_color,
                settings.my_number,
            )?)
        } else {
            None
        };
        Ok(Self::with_channels(settings, vision, referee, logger))
    }

    /// Build a controller around already opened channels.
    pub fn with_channels(
        settings: OdensSettings,
        vision: VisionChannel,
        referee: Option<RefereeChannel>,
        logger: Option<MatchLogger>,
    ) -> Self {
        Self {
            vision: Supervised::new("vision", vision),
            referee: referee.map(|channel| Supervised::new("referee", channel)),
            mapper: VisionMapper::from_settings(&settings),
            estimator: Estimator::new(settings.estimator),
            decider: GameModeDecider::new(settings.my_color, settings.game),
            logger,
            referee_command: None,
            mode: GameMode::default(),
            epoch: Instant::now(),
            settings,
        }
    }

    pub fn settings(&self) -> &OdensSettings {
        &self.settings
    }

    pub fn match_log_path(&self) -> Option<PathBuf> {
        self.logger.as_ref().map(|logger| logger.path().to_owned())
    }

    /// Run one control cycle: wait for the next vision frame, update the estimate,
    /// read the referee and decide the play mode.
    pub fn tick(&mut self) -> TickRecord {
        let observed = self.observe();
        let now = seconds_since(self.epoch);
        let (field, ball_velocity) = self.estimator.update_with_velocity(&observed, now);

        let command = self.poll_referee();
        let mode = self.decider.decide(command, &field.ball, now);
        if mode != self.mode {
            log::info!("Game mode {}", mode);
            self.mode = mode;
        }

        let record = TickRecord {
            time: now,
            field,
            ball_velocity,
            referee_command: self.referee_command,
            mode,
        };
        if let Some(logger) = &self.logger {
            logger.log_tick(record.clone());
        }
        record
    }

    /// The mapped observation of this tick, empty when vision timed out or is down.
    fn observe(&mut self) -> TeamFieldState {
        let epoch = self.epoch;
        let settings = &self.settings;
        let poll = match self
            .vision
            .channel(|| VisionChannel::start(&settings.vision.address, settings.vision.port))
        {
            Some(channel) => channel.get(),
            None => {
                thread::sleep(IDLE_PERIOD);
                return TeamFieldState::new(seconds_since(epoch));
            }
        };

        match poll {
            Ok(VisionPoll::Frame(frame)) => {
                match frame.gap() {
                    FrameGap::Nominal => {}
                    FrameGap::Dropped(delta) => {
                        log::debug!("Vision frame number advanced by {}", delta)
                    }
                    FrameGap::Reordered(delta) => {
                        log::warn!("Vision frame out of order (delta {})", delta)
                    }
                }
                let mut field = self.mapper.map(&frame.frame).field;
                field.time = seconds_since(epoch);
                field
            }
            Ok(VisionPoll::Timeout) => {
                log::warn!("Vision timeout");
                TeamFieldState::new(seconds_since(epoch))
            }
            Err(err) => {
                self.vision.close(&err);
                TeamFieldState::new(seconds_since(epoch))
            }
        }
    }

    /// The command the decider should act on this tick.
    fn poll_referee(&mut self) -> RefereeCommand {
        let Some(referee) = &mut self.referee else {
            return RefereeCommand::NormalStart;
        };
        let settings = &self.settings;
        let poll = match referee
            .channel(|| RefereeChannel::start(&settings.referee.address, settings.referee.port))
        {
            Some(channel) => channel.get(),
            None => return self.referee_command.unwrap_or(RefereeCommand::Halt),
        };

        match poll {
            Ok(RefereePoll::Fresh(snapshot)) => {
                if self.referee_command != Some(snapshot.command) {
                    log::info!("Referee {} ({})", snapshot.command, snapshot.stage);
                }
                self.referee_command = Some(snapshot.command);
            }
            Ok(RefereePoll::Stale(_)) => {}
            Ok(RefereePoll::NotYetReceived) => log::debug!("Referee not yet received"),
            Err(err) => referee.close(&err),
        }
        // Halt until the referee box has been heard from.
        self.referee_command.unwrap_or(RefereeCommand::Halt)
    }
}

fn seconds_since(epoch: Instant) -> f64 {
    epoch.elapsed().as_secs_f64()
}

#[cfg(test)]
mod tests {
    use std::net::{SocketAddr, UdpSocket};

    use odens_core::{KickType, PlayType, TeamColor};
    use odens_logger::LogFile;
    use odens_protos::{
        ssl_referee::{referee::Command, referee::Stage, referee::TeamInfo, Referee},
        ssl_vision_detection::{SSL_DetectionBall, SSL_DetectionFrame},
        ssl_vision_wrapper::SSL_WrapperPacket,
        Message,
    };
    use odens_ssl_client::Transport;

    use super::*;

    fn vision_packet(frame_number: u32, ball_x: f32) -> Vec<u8> {
        let mut detection = SSL_DetectionFrame::new();
        detection.set_frame_number(frame_number);
        detection.set_t_capture(0.0);
        detection.set_t_sent(0.0);
        detection.set_camera_id(0);

        let mut ball = SSL_DetectionBall::new();
        ball.set_confidence(1.0);
        ball.set_x(ball_x);
        ball.set_y(0.0);
        ball.set_pixel_x(0.0);
        ball.set_pixel_y(0.0);
        detection.balls.push(ball);

        let mut packet = SSL_WrapperPacket::new();
        packet.detection = Some(detection).into();
        packet.write_to_bytes().unwrap()
    }

    fn team_info(name: &str) -> TeamInfo {
        let mut info = TeamInfo::new();
        info.set_name(name.to_owned());
        info.set_score(0);
        info.set_red_cards(0);
        info.set_yellow_cards(0);
        info.set_timeouts(4);
        info.set_timeout_time(300_000_000);
        info.set_goalie(0);
        info
    }

    fn referee_packet(timestamp: u64, command: Command) -> Vec<u8> {
        let mut referee = Referee::new();
        referee.set_packet_timestamp(timestamp);
        referee.set_stage(Stage::NORMAL_FIRST_HALF);
        referee.set_command(command);
        referee.set_command_counter(1);
        referee.set_command_timestamp(timestamp);
        referee.yellow = Some(team_info("yellow")).into();
        referee.blue = Some(team_info("blue")).into();
        referee.write_to_bytes().unwrap()
    }

    fn loopback<I: Message>() -> (Transport<I>, SocketAddr) {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = transport.local_addr().unwrap();
        (transport, addr)
    }

    fn settings(referee_enabled: bool) -> OdensSettings {
        OdensSettings {
            my_color: TeamColor::Yellow,
            my_number: 2,
            referee_enabled,
            ..Default::default()
        }
    }

    fn closed() -> ChannelError {
        ChannelError::Closed {
            reason: "test stopped".into(),
        }
    }

    #[test]
    fn closed_channel_waits_for_backoff() {
        let mut feed = Supervised::new("test", 1u32);
        let mut starts = 0;
        assert_eq!(
            feed.channel(|| {
                starts += 1;
                Ok(2)
            }),
            Some(&mut 1)
        );
        assert_eq!(starts, 0);

        feed.close(&closed());
        assert_eq!(
            feed.channel(|| {
                starts += 1;
                Ok(2)
            }),
            None
        );
        assert_eq!(starts, 0);

        // Pretend the back-off has passed.
        feed.retry_at = Some(Instant::now());
        assert_eq!(
            feed.channel(|| {
                starts += 1;
                Ok(2)
            }),
            Some(&mut 2)
        );
        assert_eq!(starts, 1);
        assert_eq!(feed.retry_at, None);
    }

    #[test]
    fn failed_restart_rearms_backoff() {
        let mut feed = Supervised::<u32>::new("test", 1);
        feed.close(&closed());
        feed.retry_at = Some(Instant::now());

        let before = Instant::now();
        assert_eq!(feed.channel(|| anyhow::bail!("bind failed")), None);
        let retry_at = feed.retry_at.unwrap();
        assert!(retry_at >= before + RESTART_BACKOFF);

        let mut starts = 0;
        assert_eq!(
            feed.channel(|| {
                starts += 1;
                Ok(3)
            }),
            None
        );
        assert_eq!(starts, 0);
    }

    #[test]
    fn ticks_without_referee_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (transport, vision_addr) = loopback();
        let vision = VisionChannel::with_transport(transport).unwrap();
        let logger = MatchLogger::open(dir.path().join("match.log")).unwrap();
        let mut controller =
            Controller::with_channels(settings(false), vision, None, Some(logger));
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&vision_packet(1, 100.0), vision_addr).unwrap();
        let record = controller.tick();
        assert!(record.field.ball.is_visible());
        assert_eq!(record.referee_command, None);
        // NORMAL_START with nothing latched starts a set play.
        assert_eq!(record.mode, GameMode::new(PlayType::SetPlay, KickType::None));

        let path = controller.match_log_path().unwrap();
        drop(controller);
        let log = LogFile::open(path).unwrap();
        assert_eq!(log.ticks().count(), 1);
    }

    #[test]
    fn follows_referee_commands() {
        let (vision_transport, vision_addr) = loopback();
        let (referee_transport, referee_addr) = loopback();
        let vision = VisionChannel::with_transport(vision_transport).unwrap();
        let referee = RefereeChannel::with_transport(referee_transport).unwrap();
        let mut controller = Controller::with_channels(settings(true), vision, Some(referee), None);
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender
            .send_to(&referee_packet(10, Command::STOP), referee_addr)
            .unwrap();
        // Give the receive thread time to publish before the tick polls.
        thread::sleep(Duration::from_millis(200));
        sender.send_to(&vision_packet(1, 0.0), vision_addr).unwrap();
        let record = controller.tick();
        assert_eq!(record.referee_command, Some(RefereeCommand::Stop));
        assert_eq!(record.mode.play, PlayType::OutOfPlay);

        sender
            .send_to(&referee_packet(20, Command::PREPARE_KICKOFF_YELLOW), referee_addr)
            .unwrap();
        thread::sleep(Duration::from_millis(200));
        sender.send_to(&vision_packet(2, 0.0), vision_addr).unwrap();
        let record = controller.tick();
        assert_eq!(
            record.mode,
            GameMode::new(PlayType::PreSetPlay, KickType::OurKickOff)
        );
    }

    #[test]
    fn halts_until_referee_is_heard() {
        let (vision_transport, vision_addr) = loopback();
        let (referee_transport, _) = loopback();
        let vision = VisionChannel::with_transport(vision_transport).unwrap();
        let referee = RefereeChannel::with_transport(referee_transport).unwrap();
        let mut controller = Controller::with_channels(settings(true), vision, Some(referee), None);
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();

        sender.send_to(&vision_packet(5, 0.0), vision_addr).unwrap();
        let record = controller.tick();
        assert_eq!(record.referee_command, None);
        assert_eq!(record.mode.play, PlayType::Halt);
    }

    #[test]
    fn vision_timeout_yields_empty_observation() {
        let (transport, _) = loopback();
        let vision = VisionChannel::with_transport(transport).unwrap();
        let mut controller = Controller::with_channels(settings(false), vision, None, None);
        let record = controller.tick();
        assert!(record.field.ball.is_invisible());
        assert_eq!(record.ball_velocity.speed(), 0.0);
    }
}
