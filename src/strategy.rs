use std::{fmt, str::FromStr};

use thiserror::Error;

/// Placement policy used to pick a free block for a request.
///
/// | Strategy   | Picks                                   | Scan           |
/// |------------|-----------------------------------------|----------------|
/// | `FirstFit` | first block large enough                | stops on match |
/// | `BestFit`  | smallest block large enough             | whole list     |
/// | `WorstFit` | largest block large enough              | whole list     |
///
/// Ties go to the block found first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    #[default]
    FirstFit,
    BestFit,
    WorstFit,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::FirstFit, Strategy::BestFit, Strategy::WorstFit];

    /// Runs the selection over `candidates` in order, returning the key of the
    /// chosen candidate. Each candidate is a `(key, size)` pair and only sizes
    /// `>= needed` qualify.
    pub fn select<K, I>(self, candidates: I, needed: usize) -> Option<K>
    where
        I: IntoIterator<Item = (K, usize)>,
    {
        let mut chosen: Option<(K, usize)> = None;

        for (key, size) in candidates {
            if size < needed {
                continue;
            }

            let better = match (self, &chosen) {
                (Strategy::FirstFit, _) => return Some(key),
                (_, None) => true,
                (Strategy::BestFit, Some((_, current))) => size < *current,
                (Strategy::WorstFit, Some((_, current))) => size > *current,
            };

            if better {
                chosen = Some((key, size));
            }
        }

        chosen.map(|(key, _)| key)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::FirstFit => "first-fit",
            Strategy::BestFit => "best-fit",
            Strategy::WorstFit => "worst-fit",
        })
    }
}

/// Returned when a string names no known placement strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement strategy `{0}`")]
pub struct ParseStrategyError(pub String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "first-fit" | "first" => Ok(Strategy::FirstFit),
            "best-fit" | "best" => Ok(Strategy::BestFit),
            "worst-fit" | "worst" => Ok(Strategy::WorstFit),
            other => Err(ParseStrategyError(other.to_owned())),
        }
    }
}
