use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use odens_core::{RefereeCommand, RefereeSnapshot, Stage, TeamColor};
use odens_protos::ssl_referee::Referee;

use crate::{
    mailbox::{check_open, ChannelError, Mailbox, ReceiveThread},
    transport::Transport,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefereePoll {
    /// No referee packet has arrived since the channel started.
    NotYetReceived,
    /// The latest packet is the one this consumer already read.
    Stale(RefereeSnapshot),
    Fresh(RefereeSnapshot),
}

impl RefereePoll {
    pub fn snapshot(&self) -> Option<&RefereeSnapshot> {
        match self {
            RefereePoll::NotYetReceived => None,
            RefereePoll::Stale(snapshot) | RefereePoll::Fresh(snapshot) => Some(snapshot),
        }
    }
}

/// Receives referee box packets on a background thread and keeps the most recent
/// one.
pub struct RefereeChannel {
    mailbox: Arc<Mailbox<RefereeSnapshot>>,
    receiver: RefereeReceiver,
    _thread: ReceiveThread,
}

impl RefereeChannel {
    /// Join the referee multicast group and start receiving.
    pub fn start(address: &str, port: u16) -> Result<Self> {
        let transport = Transport::multicast(address, port)
            .with_context(|| format!("Failed to open referee socket {}:{}", address, port))?;
        Self::with_transport(transport)
    }

    pub fn with_transport(transport: Transport<Referee>) -> Result<Self> {
        let mailbox = Arc::new(Mailbox::new());
        let thread = ReceiveThread::spawn(
            "referee-receiver",
            transport,
            Arc::clone(&mailbox),
            |msg| decode_referee(&msg).map(Some),
        )?;
        Ok(Self {
            receiver: RefereeReceiver::new(Arc::clone(&mailbox)),
            mailbox,
            _thread: thread,
        })
    }

    pub fn subscribe(&self) -> RefereeReceiver {
        RefereeReceiver::new(Arc::clone(&self.mailbox))
    }

    /// [`RefereeReceiver::get`] on the channel's own consumer.
    pub fn get(&mut self) -> Result<RefereePoll, ChannelError> {
        self.receiver.get()
    }
}

/// One consumer of a [`RefereeChannel`].
pub struct RefereeReceiver {
    mailbox: Arc<Mailbox<RefereeSnapshot>>,
    packet_timestamp: Option<u64>,
}

impl RefereeReceiver {
    fn new(mailbox: Arc<Mailbox<RefereeSnapshot>>) -> Self {
        Self {
            mailbox,
            packet_timestamp: None,
        }
    }

    /// Poll the latest referee snapshot without blocking.
    pub fn get(&mut self) -> Result<RefereePoll, ChannelError> {
        let slot = self.mailbox.lock();
        check_open(&slot)?;
        let Some(snapshot) = slot.latest else {
            return Ok(RefereePoll::NotYetReceived);
        };
        drop(slot);

        if self.packet_timestamp == Some(snapshot.packet_timestamp) {
            return Ok(RefereePoll::Stale(snapshot));
        }
        self.packet_timestamp = Some(snapshot.packet_timestamp);
        Ok(RefereePoll::Fresh(snapshot))
    }
}

/// Convert a referee packet into a snapshot. Unknown stage or command values are
/// rejected.
pub fn decode_referee(msg: &Referee) -> Result<RefereeSnapshot> {
    let stage = msg
        .stage
        .map(|stage| stage.value())
        .ok_or_else(|| anyhow!("referee packet without stage"))?;
    let stage = Stage::try_from(stage).map_err(|value| anyhow!("unknown stage {}", value))?;
    let command = msg
        .command
        .map(|command| command.value())
        .ok_or_else(|| anyhow!("referee packet without command"))?;
    let command = RefereeCommand::try_from(command)
        .map_err(|value| anyhow!("unknown referee command {}", value))?;

    let mut score = [0; 2];
    score[TeamColor::Blue.index()] = msg.blue.score();
    score[TeamColor::Yellow.index()] = msg.yellow.score();

    Ok(RefereeSnapshot {
        packet_timestamp: msg.packet_timestamp(),
        stage,
        stage_time_left: msg.stage_time_left(),
        command,
        command_counter: msg.command_counter(),
        score,
    })
}

#[cfg(test)]
mod tests {
    use std::{net::UdpSocket, thread, time::Duration};

    use odens_protos::{
        ssl_referee::referee::{Command, Stage as WireStage, TeamInfo},
        EnumOrUnknown, Message,
    };

    use super::*;

    fn team_info(name: &str, score: u32) -> TeamInfo {
        let mut info = TeamInfo::new();
        info.set_name(name.to_owned());
        info.set_score(score);
        info.set_red_cards(0);
        info.set_yellow_cards(0);
        info.set_timeouts(4);
        info.set_timeout_time(300_000_000);
        info.set_goalie(0);
        info
    }

    fn referee(timestamp: u64, command: Command) -> Referee {
        let mut msg = Referee::new();
        msg.set_packet_timestamp(timestamp);
        msg.set_stage(WireStage::NORMAL_FIRST_HALF);
        msg.set_stage_time_left(120_000_000);
        msg.set_command(command);
        msg.set_command_counter(3);
        msg.set_command_timestamp(timestamp);
        msg.yellow = Some(team_info("yellow", 1)).into();
        msg.blue = Some(team_info("blue", 2)).into();
        msg
    }

    #[test]
    fn decodes_snapshot() {
        let snapshot = decode_referee(&referee(1000, Command::PREPARE_KICKOFF_BLUE)).unwrap();
        assert_eq!(snapshot.packet_timestamp, 1000);
        assert_eq!(snapshot.stage, Stage::NormalFirstHalf);
        assert_eq!(
            snapshot.command,
            RefereeCommand::PrepareKickoff(TeamColor::Blue)
        );
        assert_eq!(snapshot.command_counter, 3);
        assert_eq!(snapshot.score(TeamColor::Blue), 2);
        assert_eq!(snapshot.score(TeamColor::Yellow), 1);
    }

    #[test]
    fn unknown_command_is_an_error() {
        let mut msg = referee(1000, Command::HALT);
        msg.command = Some(EnumOrUnknown::from_i32(42));
        assert!(decode_referee(&msg).is_err());
    }

    fn wait_for_packet(receiver: &mut RefereeReceiver) -> RefereePoll {
        for _ in 0..200 {
            match receiver.get().unwrap() {
                RefereePoll::NotYetReceived => thread::sleep(Duration::from_millis(10)),
                poll => return poll,
            }
        }
        panic!("no referee packet received");
    }

    #[test]
    fn fresh_then_stale() {
        let transport = Transport::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = transport.local_addr().unwrap();
        let mut channel = RefereeChannel::with_transport(transport).unwrap();
        let mut other = channel.subscribe();
        assert_eq!(channel.get().unwrap(), RefereePoll::NotYetReceived);

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let bytes = referee(1000, Command::STOP).write_to_bytes().unwrap();
        sender.send_to(&bytes, addr).unwrap();

        let mut receiver = channel.subscribe();
        let RefereePoll::Fresh(snapshot) = wait_for_packet(&mut receiver) else {
            panic!("expected a fresh snapshot");
        };
        assert_eq!(snapshot.command, RefereeCommand::Stop);
        assert!(matches!(receiver.get().unwrap(), RefereePoll::Stale(_)));
        // Cursors are per consumer.
        assert!(matches!(other.get().unwrap(), RefereePoll::Fresh(_)));
        assert!(matches!(channel.get().unwrap(), RefereePoll::Fresh(_)));
    }
}
