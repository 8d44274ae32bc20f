//! Skill tiers used to parameterize statistics queries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    #[error("Unknown tier level: {0} (expected 1-8)")]
    UnknownLevel(i64),

    #[error("Unknown tier name: {0}")]
    UnknownName(String),
}

/// Rank bracket. The numeric level is what the upstream API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Warrior,
    Elite,
    Master,
    Grandmaster,
    Epic,
    Legend,
    #[default]
    Mythic,
    MythicalGlory,
}

impl Tier {
    pub const ALL: [Tier; 8] = [
        Tier::Warrior,
        Tier::Elite,
        Tier::Master,
        Tier::Grandmaster,
        Tier::Epic,
        Tier::Legend,
        Tier::Mythic,
        Tier::MythicalGlory,
    ];

    pub fn level(&self) -> u8 {
        match self {
            Tier::Warrior => 1,
            Tier::Elite => 2,
            Tier::Master => 3,
            Tier::Grandmaster => 4,
            Tier::Epic => 5,
            Tier::Legend => 6,
            Tier::Mythic => 7,
            Tier::MythicalGlory => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Warrior => "Warrior",
            Tier::Elite => "Elite",
            Tier::Master => "Master",
            Tier::Grandmaster => "Grandmaster",
            Tier::Epic => "Epic",
            Tier::Legend => "Legend",
            Tier::Mythic => "Mythic",
            Tier::MythicalGlory => "Mythical Glory",
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = TierError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Tier::ALL
            .iter()
            .copied()
            .find(|t| t.level() == level)
            .ok_or(TierError::UnknownLevel(level as i64))
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.level()
    }
}

impl FromStr for Tier {
    type Err = TierError;

    /// Accepts either the numeric level or the tier name (case and
    /// separator insensitive, so "mythical-glory" works).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<i64>() {
            return u8::try_from(level)
                .map_err(|_| TierError::UnknownLevel(level))
                .and_then(Tier::try_from);
        }

        let wanted = squash(s);
        Tier::ALL
            .iter()
            .copied()
            .find(|t| squash(t.name()) == wanted)
            .ok_or_else(|| TierError::UnknownName(s.to_string()))
    }
}

fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Leaderboard filter: a single tier or every tier combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RankFilter {
    #[default]
    Overall,
    Tier(Tier),
}

impl RankFilter {
    /// Value sent as the `rank` query parameter.
    pub fn query_value(&self) -> String {
        match self {
            RankFilter::Overall => "Overall".to_string(),
            RankFilter::Tier(t) => t.name().to_string(),
        }
    }
}

impl FromStr for RankFilter {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("overall") {
            Ok(RankFilter::Overall)
        } else {
            s.parse().map(RankFilter::Tier)
        }
    }
}

impl fmt::Display for RankFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankFilter::Overall => write!(f, "Overall"),
            RankFilter::Tier(t) => write!(f, "{}", t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mythic() {
        assert_eq!(Tier::default(), Tier::Mythic);
        assert_eq!(Tier::default().level(), 7);
    }

    #[test]
    fn test_levels_are_one_through_eight() {
        let levels: Vec<u8> = Tier::ALL.iter().map(|t| t.level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_try_from_rejects_out_of_range() {
        assert_eq!(Tier::try_from(0), Err(TierError::UnknownLevel(0)));
        assert_eq!(Tier::try_from(9), Err(TierError::UnknownLevel(9)));
        assert_eq!(Tier::try_from(3), Ok(Tier::Master));
    }

    #[test]
    fn test_from_str_level_and_name() {
        assert_eq!("5".parse::<Tier>(), Ok(Tier::Epic));
        assert_eq!("legend".parse::<Tier>(), Ok(Tier::Legend));
        assert_eq!("Mythical Glory".parse::<Tier>(), Ok(Tier::MythicalGlory));
        assert_eq!("mythical-glory".parse::<Tier>(), Ok(Tier::MythicalGlory));
        assert!("-1".parse::<Tier>().is_err());
        assert!("300".parse::<Tier>().is_err());
        assert!("bronze".parse::<Tier>().is_err());
    }

    #[test]
    fn test_serde_uses_level() {
        assert_eq!(serde_json::to_string(&Tier::Grandmaster).unwrap(), "4");
        let parsed: Tier = serde_json::from_str("6").unwrap();
        assert_eq!(parsed, Tier::Legend);
        assert!(serde_json::from_str::<Tier>("12").is_err());
    }

    #[test]
    fn test_rank_filter() {
        assert_eq!("overall".parse::<RankFilter>(), Ok(RankFilter::Overall));
        assert_eq!("7".parse::<RankFilter>(), Ok(RankFilter::Tier(Tier::Mythic)));
        assert_eq!(RankFilter::Overall.query_value(), "Overall");
        assert_eq!(RankFilter::Tier(Tier::Epic).query_value(), "Epic");
    }
}
