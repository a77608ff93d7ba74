use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::Span;

/// One pipeline operation. Every operation rewrites the main track (slot 1);
/// `slot` fields are 1-based references to another track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    /// `mix $slot [insert_at]` averages the main track with `slot`, starting
    /// `insert_at` seconds into the main track.
    Mix {
        slot: usize,
        #[serde(default)]
        insert_at: u64,
    },
    /// `mute start end` silences `[start, end)` seconds of the main track.
    Mute { start: u64, end: u64 },
    /// `resample percent%` resamples the main track by `percent / 100`.
    Resample { percent: u64 },
    /// `vocoder $slot` imposes the main track's spectral envelope on `slot`.
    Vocoder { slot: usize },
}

impl Operation {
    /// Command name as written in a script.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Mix { .. } => "mix",
            Operation::Mute { .. } => "mute",
            Operation::Resample { .. } => "resample",
            Operation::Vocoder { .. } => "vocoder",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Mix { slot, insert_at: 0 } => write!(f, "mix ${slot}"),
            Operation::Mix { slot, insert_at } => write!(f, "mix ${slot} {insert_at}"),
            Operation::Mute { start, end } => write!(f, "mute {start} {end}"),
            Operation::Resample { percent } => write!(f, "resample {percent}%"),
            Operation::Vocoder { slot } => write!(f, "vocoder ${slot}"),
        }
    }
}

/// A parsed operation together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub operation: Operation,
    pub span: Span,
}
