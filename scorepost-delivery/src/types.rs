use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::ScoreError;

/// Content score on the scale-of-belief range.
///
/// Serialised as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ContentScore(u8);

impl ContentScore {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 8;

    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ContentScore {
    type Error = ScoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= Self::MAX {
            Ok(Self(value))
        } else {
            Err(ScoreError::OutOfRange(value))
        }
    }
}

impl From<ContentScore> for u8 {
    fn from(score: ContentScore) -> Self {
        score.0
    }
}

impl Display for ContentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single `(uri, score)` pair to report to the scoring API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub uri: String,
    pub score: ContentScore,
}

impl WorkItem {
    /// # Errors
    ///
    /// Returns [`ScoreError::OutOfRange`] if `score` is above [`ContentScore::MAX`].
    pub fn new(uri: impl Into<String>, score: u8) -> Result<Self, ScoreError> {
        Ok(Self {
            uri: uri.into(),
            score: ContentScore::try_from(score)?,
        })
    }
}

impl Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (score {})", self.uri, self.score)
    }
}

/// A group of items that failed together, and how many times they have been
/// tried since first failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEnvelope {
    pub items: Vec<WorkItem>,
    pub attempts: u32,
}

impl RetryEnvelope {
    /// Wrap a freshly failed batch. The first failure counts as attempt 1.
    #[must_use]
    pub const fn new(items: Vec<WorkItem>) -> Self {
        Self { items, attempts: 1 }
    }
}

impl Display for RetryEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batch = serde_json::to_string(&self.items).map_err(|_| fmt::Error)?;
        write!(f, "RetryEnvelope [batch = {batch}, attempts = {}]", self.attempts)
    }
}
