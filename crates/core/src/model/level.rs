use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LevelError {
    #[error("unknown content level: {0}")]
    UnknownContentLevel(String),

    #[error("unknown knowledge level: {0}")]
    UnknownKnowledgeLevel(String),
}

//
// ─── CONTENT LEVEL ─────────────────────────────────────────────────────────────
//

/// Tier of course materials, ordered from most to least restrictive view.
///
/// The derived `Ord` follows the ordinal mapping basic=0, intermediate=1,
/// advanced=2, which is what the material filter compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentLevel {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl ContentLevel {
    pub const ALL: [ContentLevel; 3] = [
        ContentLevel::Basic,
        ContentLevel::Intermediate,
        ContentLevel::Advanced,
    ];

    #[must_use]
    pub fn ordinal(self) -> u8 {
        match self {
            ContentLevel::Basic => 0,
            ContentLevel::Intermediate => 1,
            ContentLevel::Advanced => 2,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentLevel::Basic => "basic",
            ContentLevel::Intermediate => "intermediate",
            ContentLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ContentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentLevel {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(LevelError::UnknownContentLevel(other.to_owned())),
        }
    }
}

//
// ─── KNOWLEDGE LEVEL ───────────────────────────────────────────────────────────
//

/// Learner's self-declared starting point for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLevel {
    Basic,
    Intermediate,
}

impl KnowledgeLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KnowledgeLevel::Basic => "basic",
            KnowledgeLevel::Intermediate => "intermediate",
        }
    }

    /// Tier unlocked immediately after selecting this level.
    #[must_use]
    pub fn seeded_content_level(self) -> ContentLevel {
        match self {
            KnowledgeLevel::Basic => ContentLevel::Basic,
            KnowledgeLevel::Intermediate => ContentLevel::Intermediate,
        }
    }

    /// Whether the learner must sit a pre-test before studying.
    #[must_use]
    pub fn requires_pre_test(self) -> bool {
        matches!(self, KnowledgeLevel::Intermediate)
    }
}

impl fmt::Display for KnowledgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeLevel {
    type Err = LevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "intermediate" => Ok(Self::Intermediate),
            other => Err(LevelError::UnknownKnowledgeLevel(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_follow_tier_order() {
        assert_eq!(ContentLevel::Basic.ordinal(), 0);
        assert_eq!(ContentLevel::Intermediate.ordinal(), 1);
        assert_eq!(ContentLevel::Advanced.ordinal(), 2);
        assert!(ContentLevel::Basic < ContentLevel::Intermediate);
        assert!(ContentLevel::Intermediate < ContentLevel::Advanced);
    }

    #[test]
    fn parses_round_trip_labels() {
        for level in ContentLevel::ALL {
            assert_eq!(level.as_str().parse::<ContentLevel>().unwrap(), level);
        }
        assert!("expert".parse::<ContentLevel>().is_err());
    }

    #[test]
    fn knowledge_level_rejects_advanced() {
        let err = "advanced".parse::<KnowledgeLevel>().unwrap_err();
        assert_eq!(err, LevelError::UnknownKnowledgeLevel("advanced".into()));
    }

    #[test]
    fn knowledge_level_seeds_matching_tier() {
        assert_eq!(
            KnowledgeLevel::Basic.seeded_content_level(),
            ContentLevel::Basic
        );
        assert_eq!(
            KnowledgeLevel::Intermediate.seeded_content_level(),
            ContentLevel::Intermediate
        );
        assert!(KnowledgeLevel::Intermediate.requires_pre_test());
        assert!(!KnowledgeLevel::Basic.requires_pre_test());
    }
}
