use std::fmt;

use serde::{Deserialize, Serialize};

use crate::TeamColor;

/// Match stage as announced by the referee box.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    NormalFirstHalfPre,
    NormalFirstHalf,
    NormalHalfTime,
    NormalSecondHalfPre,
    NormalSecondHalf,
    ExtraTimeBreak,
    ExtraFirstHalfPre,
    ExtraFirstHalf,
    ExtraHalfTime,
    ExtraSecondHalfPre,
    ExtraSecondHalf,
    PenaltyShootoutBreak,
    PenaltyShootout,
    PostGame,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NormalFirstHalfPre => "NORMAL_FIRST_HALF_PRE",
            Stage::NormalFirstHalf => "NORMAL_FIRST_HALF",
            Stage::NormalHalfTime => "NORMAL_HALF_TIME",
            Stage::NormalSecondHalfPre => "NORMAL_SECOND_HALF_PRE",
            Stage::NormalSecondHalf => "NORMAL_SECOND_HALF",
            Stage::ExtraTimeBreak => "EXTRA_TIME_BREAK",
            Stage::ExtraFirstHalfPre => "EXTRA_FIRST_HALF_PRE",
            Stage::ExtraFirstHalf => "EXTRA_FIRST_HALF",
            Stage::ExtraHalfTime => "EXTRA_HALF_TIME",
            Stage::ExtraSecondHalfPre => "EXTRA_SECOND_HALF_PRE",
            Stage::ExtraSecondHalf => "EXTRA_SECOND_HALF",
            Stage::PenaltyShootoutBreak => "PENALTY_SHOOTOUT_BREAK",
            Stage::PenaltyShootout => "PENALTY_SHOOTOUT",
            Stage::PostGame => "POST_GAME",
        }
    }
}

impl TryFrom<i32> for Stage {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Stage::NormalFirstHalfPre,
            1 => Stage::NormalFirstHalf,
            2 => Stage::NormalHalfTime,
            3 => Stage::NormalSecondHalfPre,
            4 => Stage::NormalSecondHalf,
            5 => Stage::ExtraTimeBreak,
            6 => Stage::ExtraFirstHalfPre,
            7 => Stage::ExtraFirstHalf,
            8 => Stage::ExtraHalfTime,
            9 => Stage::ExtraSecondHalfPre,
            10 => Stage::ExtraSecondHalf,
            11 => Stage::PenaltyShootoutBreak,
            12 => Stage::PenaltyShootout,
            13 => Stage::PostGame,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referee box command.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefereeCommand {
    Halt,
    Stop,
    NormalStart,
    ForceStart,
    PrepareKickoff(TeamColor),
    PreparePenalty(TeamColor),
    DirectFree(TeamColor),
    IndirectFree(TeamColor),
    Timeout(TeamColor),
    Goal(TeamColor),
}

impl RefereeCommand {
    pub fn as_str(&self) -> &'static str {
        use TeamColor::*;
        match self {
            RefereeCommand::Halt => "HALT",
            RefereeCommand::Stop => "STOP",
            RefereeCommand::NormalStart => "NORMAL_START",
            RefereeCommand::ForceStart => "FORCE_START",
            RefereeCommand::PrepareKickoff(Yellow) => "PREPARE_KICKOFF_YELLOW",
            RefereeCommand::PrepareKickoff(Blue) => "PREPARE_KICKOFF_BLUE",
            RefereeCommand::PreparePenalty(Yellow) => "PREPARE_PENALTY_YELLOW",
            RefereeCommand::PreparePenalty(Blue) => "PREPARE_PENALTY_BLUE",
            RefereeCommand::DirectFree(Yellow) => "DIRECT_FREE_YELLOW",
            RefereeCommand::DirectFree(Blue) => "DIRECT_FREE_BLUE",
            RefereeCommand::IndirectFree(Yellow) => "INDIRECT_FREE_YELLOW",
            RefereeCommand::IndirectFree(Blue) => "INDIRECT_FREE_BLUE",
            RefereeCommand::Timeout(Yellow) => "TIMEOUT_YELLOW",
            RefereeCommand::Timeout(Blue) => "TIMEOUT_BLUE",
            RefereeCommand::Goal(Yellow) => "GOAL_YELLOW",
            RefereeCommand::Goal(Blue) => "GOAL_BLUE",
        }
    }
}

impl TryFrom<i32> for RefereeCommand {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use TeamColor::*;
        Ok(match value {
            0 => RefereeCommand::Halt,
            1 => RefereeCommand::Stop,
            2 => RefereeCommand::NormalStart,
            3 => RefereeCommand::ForceStart,
            4 => RefereeCommand::PrepareKickoff(Yellow),
            5 => RefereeCommand::PrepareKickoff(Blue),
            6 => RefereeCommand::PreparePenalty(Yellow),
            7 => RefereeCommand::PreparePenalty(Blue),
            8 => RefereeCommand::DirectFree(Yellow),
            9 => RefereeCommand::DirectFree(Blue),
            10 => RefereeCommand::IndirectFree(Yellow),
            11 => RefereeCommand::IndirectFree(Blue),
            12 => RefereeCommand::Timeout(Yellow),
            13 => RefereeCommand::Timeout(Blue),
            14 => RefereeCommand::Goal(Yellow),
            15 => RefereeCommand::Goal(Blue),
            other => return Err(other),
        })
    }
}

impl fmt::Display for RefereeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decoded content of one referee packet.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RefereeSnapshot {
    /// Microseconds since the epoch, as sent by the referee box.
    pub packet_timestamp: u64,
    pub stage: Stage,
    /// Microseconds left in the stage; 0 when not sent.
    pub stage_time_left: i32,
    pub command: RefereeCommand,
    pub command_counter: u32,
    /// Score indexed by [`TeamColor::index`].
    pub score: [u32; 2],
}

impl Default for RefereeSnapshot {
    fn default() -> Self {
        Self {
            packet_timestamp: 0,
            stage: Stage::NormalFirstHalfPre,
            stage_time_left: 0,
            command: RefereeCommand::Halt,
            command_counter: 0,
            score: [0, 0],
        }
    }
}

impl RefereeSnapshot {
    pub fn score(&self, color: TeamColor) -> u32 {
        self.score[color.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_codes_round_trip_names() {
        for code in 0..16 {
            let cmd = RefereeCommand::try_from(code).unwrap();
            assert!(!cmd.as_str().is_empty());
        }
        assert_eq!(RefereeCommand::try_from(16), Err(16));
        assert_eq!(
            RefereeCommand::try_from(5).unwrap().as_str(),
            "PREPARE_KICKOFF_BLUE"
        );
        assert_eq!(
            RefereeCommand::try_from(14).unwrap(),
            RefereeCommand::Goal(TeamColor::Yellow)
        );
    }

    #[test]
    fn stage_codes() {
        assert_eq!(Stage::try_from(13), Ok(Stage::PostGame));
        assert_eq!(Stage::try_from(-1), Err(-1));
        assert_eq!(Stage::NormalHalfTime.to_string(), "NORMAL_HALF_TIME");
    }
}
