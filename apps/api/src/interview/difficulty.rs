//! Difficulty controller: a three-state machine driven by the evaluator's delta signal.
//!
//! `DifficultyLevel` is absolute, `DeltaSignal` is relative. A "same" signal is never
//! interpreted as an absolute level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Absolute interview difficulty tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Relative adjustment emitted by the answer evaluator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaSignal {
    Harder,
    #[default]
    Same,
    Easier,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// Label embedded in generation prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown difficulty level '{0}' (expected easy, medium or hard)")]
pub struct ParseDifficultyError(String);

impl FromStr for DifficultyLevel {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

impl DeltaSignal {
    pub const ALL: [DeltaSignal; 3] = [Self::Harder, Self::Same, Self::Easier];

    /// Decision token the evaluator prompt asks for.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Harder => "HARDER",
            Self::Same => "SAME",
            Self::Easier => "EASIER",
        }
    }

    /// Reads a decision token out of free text. HARDER wins over EASIER when both
    /// appear; anything else is SAME.
    pub fn from_text(text: &str) -> Self {
        let upper = text.to_uppercase();
        if upper.contains("HARDER") {
            Self::Harder
        } else if upper.contains("EASIER") {
            Self::Easier
        } else {
            Self::Same
        }
    }
}

/// Advances the current level by one signal. Total over every (level, signal) pair.
pub fn next_level(current: DifficultyLevel, signal: DeltaSignal) -> DifficultyLevel {
    use DeltaSignal::*;
    use DifficultyLevel::*;

    match (current, signal) {
        (level, Same) => level,
        (Easy, Harder) => Medium,
        (Medium, Harder) | (Hard, Harder) => Hard,
        (Hard, Easier) => Medium,
        (Medium, Easier) | (Easy, Easier) => Easy,
    }
}
