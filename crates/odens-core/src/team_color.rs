use std::{fmt, str::FromStr};

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TeamColor {
    Blue,
    Yellow,
}

impl TeamColor {
    pub const ALL: [TeamColor; 2] = [TeamColor::Blue, TeamColor::Yellow];

    pub fn opponent(&self) -> TeamColor {
        match self {
            TeamColor::Blue => TeamColor::Yellow,
            TeamColor::Yellow => TeamColor::Blue,
        }
    }

    /// Index into per-team arrays (blue first).
    pub fn index(&self) -> usize {
        match self {
            TeamColor::Blue => 0,
            TeamColor::Yellow => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TeamColor::Blue => "blue",
            TeamColor::Yellow => "yellow",
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" | "b" => Ok(TeamColor::Blue),
            "yellow" | "y" => Ok(TeamColor::Yellow),
            other => bail!("Unknown team color: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_team_color() {
        assert_eq!("Blue".parse::<TeamColor>().unwrap(), TeamColor::Blue);
        assert_eq!("y".parse::<TeamColor>().unwrap(), TeamColor::Yellow);
        assert!("green".parse::<TeamColor>().is_err());
    }

    #[test]
    fn opponent_and_index() {
        assert_eq!(TeamColor::Blue.opponent(), TeamColor::Yellow);
        assert_eq!(TeamColor::Blue.index(), 0);
        assert_eq!(TeamColor::Yellow.index(), 1);
    }
}
