//! Turn-cycle phase and calendar values carried by bookkeeping changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One state of the turn cycle.
///
/// A live game cycles `Growth`/`Action` → `Resting` → `Planning` → `Staging`
/// → `Action`; a replay only visits `Growth`/`Action` → `Resting` → `Decay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Setup and per-turn growth of tiles.
    Growth,
    /// Orders are being resolved.
    Action,
    /// Resolution finished; waiting for end-of-round bookkeeping.
    Resting,
    /// Players are submitting orders.
    Planning,
    /// Submissions are acknowledged; late orders are still accepted until
    /// resolution starts.
    Staging,
    /// Terminal phase of a replay.
    Decay,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Growth => "growth",
            Phase::Action => "action",
            Phase::Resting => "resting",
            Phase::Planning => "planning",
            Phase::Staging => "staging",
            Phase::Decay => "decay",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    #[default]
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// The following season, wrapping winter to spring.
    pub fn next(self) -> Season {
        match self {
            Season::Spring => Season::Summer,
            Season::Summer => Season::Autumn,
            Season::Autumn => Season::Winter,
            Season::Winter => Season::Spring,
        }
    }
}

/// Half of a season. Each round advances the daytime; two rounds make a
/// season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Daytime {
    #[default]
    Early,
    Late,
}
