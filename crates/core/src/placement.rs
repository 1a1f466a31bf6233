//! Score → content tier placement.
//!
//! A single [`PlacementPolicy`] owns both score mappings used by the learner
//! flow: the binary unlock rule applied when an intermediate learner submits a
//! pre-test, and the three-way label shown alongside results. The unlock
//! threshold doubles as the advanced boundary of the label so the two mappings
//! always agree on who is "advanced".

use thiserror::Error;

use crate::model::ContentLevel;

/// Pre-test percentage at or above which advanced materials unlock.
pub const DEFAULT_UNLOCK_THRESHOLD: i32 = 70;

/// Lowest percentage labelled "intermediate" on results.
pub const DEFAULT_INTERMEDIATE_FLOOR: i32 = 50;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PlacementError {
    #[error("intermediate floor ({floor}) must not exceed unlock threshold ({threshold})")]
    InvertedThresholds { floor: i32, threshold: i32 },
}

/// Outcome of evaluating a pre-test score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementDecision {
    pub tier: ContentLevel,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPolicy {
    unlock_threshold: i32,
    intermediate_floor: i32,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            unlock_threshold: DEFAULT_UNLOCK_THRESHOLD,
            intermediate_floor: DEFAULT_INTERMEDIATE_FLOOR,
        }
    }
}

impl PlacementPolicy {
    /// Creates a policy with custom thresholds.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::InvertedThresholds` if the floor is above the
    /// unlock threshold.
    pub fn new(unlock_threshold: i32, intermediate_floor: i32) -> Result<Self, PlacementError> {
        if intermediate_floor > unlock_threshold {
            return Err(PlacementError::InvertedThresholds {
                floor: intermediate_floor,
                threshold: unlock_threshold,
            });
        }
        Ok(Self {
            unlock_threshold,
            intermediate_floor,
        })
    }

    #[must_use]
    pub fn unlock_threshold(&self) -> i32 {
        self.unlock_threshold
    }

    #[must_use]
    pub fn intermediate_floor(&self) -> i32 {
        self.intermediate_floor
    }

    /// Binary unlock rule for an intermediate learner's pre-test.
    ///
    /// Scores are not range-checked; anything at or above the threshold
    /// (inclusive) unlocks advanced, anything below drops to basic.
    #[must_use]
    pub fn evaluate_pre_test(&self, score: i32) -> PlacementDecision {
        let passed = score >= self.unlock_threshold;
        PlacementDecision {
            tier: if passed {
                ContentLevel::Advanced
            } else {
                ContentLevel::Basic
            },
            passed,
        }
    }

    /// Three-way label for displaying a score.
    #[must_use]
    pub fn classify(&self, score: i32) -> ContentLevel {
        if score >= self.unlock_threshold {
            ContentLevel::Advanced
        } else if score >= self.intermediate_floor {
            ContentLevel::Intermediate
        } else {
            ContentLevel::Basic
        }
    }
}
