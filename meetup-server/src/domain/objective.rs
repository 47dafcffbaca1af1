//! Aggregation objective for scoring a meeting point.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown objective name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown objective: {0}")]
pub struct UnknownObjective(String);

/// How per-person distances are combined into one candidate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Minimise the worst case: score is the maximum distance.
    #[serde(alias = "minimize-worst-case")]
    Minimax,
    /// Minimise the total: score is the sum of distances.
    #[serde(alias = "minimize-total")]
    Minisum,
}

impl Objective {
    /// Aggregate a sequence of distances.
    ///
    /// Returns `None` for an empty sequence.
    pub fn aggregate<I>(self, values: I) -> Option<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        Some(match self {
            Objective::Minimax => iter.fold(first, f64::max),
            Objective::Minisum => iter.fold(first, |acc, v| acc + v),
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Objective::Minimax => "minimax",
            Objective::Minisum => "minisum",
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Objective {
    type Err = UnknownObjective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimax" | "minimize-worst-case" => Ok(Objective::Minimax),
            "minisum" | "minimize-total" => Ok(Objective::Minisum),
            other => Err(UnknownObjective(other.to_string())),
        }
    }
}
