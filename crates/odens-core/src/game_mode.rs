use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PlayType {
    #[default]
    None,
    Halt,
    OutOfPlay,
    InPlay,
    SetPlay,
    PreSetPlay,
}

impl PlayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayType::None => "NONE",
            PlayType::Halt => "HALT",
            PlayType::OutOfPlay => "OUT_OF_PLAY",
            PlayType::InPlay => "IN_PLAY",
            PlayType::SetPlay => "SET_PLAY",
            PlayType::PreSetPlay => "PRE_SET_PLAY",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum KickType {
    #[default]
    None,
    OurKickOff,
    TheirKickOff,
    OurPenaltyKick,
    TheirPenaltyKick,
    OurDirectFreeKick,
    TheirDirectFreeKick,
    OurIndirectFreeKick,
    TheirIndirectFreeKick,
}

impl KickType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KickType::None => "NONE",
            KickType::OurKickOff => "OUR_KICKOFF",
            KickType::TheirKickOff => "THEIR_KICKOFF",
            KickType::OurPenaltyKick => "OUR_PENALTY_KICK",
            KickType::TheirPenaltyKick => "THEIR_PENALTY_KICK",
            KickType::OurDirectFreeKick => "OUR_DIRECT_FREE_KICK",
            KickType::TheirDirectFreeKick => "THEIR_DIRECT_FREE_KICK",
            KickType::OurIndirectFreeKick => "OUR_INDIRECT_FREE_KICK",
            KickType::TheirIndirectFreeKick => "THEIR_INDIRECT_FREE_KICK",
        }
    }

    pub fn is_theirs(&self) -> bool {
        matches!(
            self,
            KickType::TheirKickOff
                | KickType::TheirPenaltyKick
                | KickType::TheirDirectFreeKick
                | KickType::TheirIndirectFreeKick
        )
    }
}

/// Play type and kick type as decided for one tick.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct GameMode {
    pub play: PlayType,
    pub kick: KickType,
}

impl GameMode {
    pub fn new(play: PlayType, kick: KickType) -> Self {
        Self { play, kick }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.play.as_str(), self.kick.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_game_mode() {
        let mode = GameMode::new(PlayType::SetPlay, KickType::TheirKickOff);
        assert_eq!(mode.to_string(), "SET_PLAY THEIR_KICKOFF");
        assert_eq!(GameMode::default().to_string(), "NONE NONE");
    }

    #[test]
    fn kick_sides() {
        assert!(!KickType::OurPenaltyKick.is_theirs());
        assert!(KickType::TheirIndirectFreeKick.is_theirs());
        assert!(!KickType::None.is_theirs());
    }
}
