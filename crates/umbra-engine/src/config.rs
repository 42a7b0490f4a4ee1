//! Automaton settings and resource locations.
//!
//! Nothing in the simulation core reads process-wide state. The knobs that
//! shape a run live in [`AutomatonConfig`], and the directories maps,
//! rulesets and recordings are read from live in [`ResourceRoots`], which
//! the surrounding program passes to whatever owns file I/O.
//!
//! # Example
//!
//! ```
//! use umbra_engine::config::{AutomatonConfig, ResourceRoots};
//!
//! let config: AutomatonConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
//! assert_eq!(config.seed, 7);
//! assert!(!config.shuffle_players);
//!
//! let roots = ResourceRoots::under("/srv/umbra");
//! assert!(roots.map_path("duel").ends_with("maps/duel.json"));
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::LoadError;

// ---------------------------------------------------------------------------
// AutomatonConfig
// ---------------------------------------------------------------------------

/// Settings for one [`Automaton`](crate::automaton::Automaton).
///
/// Every field has a default, so a partial JSON object is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonConfig {
    /// Seed of the RNG used to assign players to map colors.
    pub seed: u64,
    /// Shuffle the roster over the map's colors when a map is loaded. When
    /// off, the map's colors are played by the players of the same color.
    pub shuffle_players: bool,
    /// Upper bound on order passes in one action phase. Orders still pending
    /// afterwards are reported unfinished.
    pub max_passes: u32,
    /// Engine version written to recording metadata.
    pub version: String,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            shuffle_players: false,
            max_passes: 20,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceRoots
// ---------------------------------------------------------------------------

/// Directories holding maps, rulesets and recordings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRoots {
    pub maps: PathBuf,
    pub rulesets: PathBuf,
    pub recordings: PathBuf,
}

impl ResourceRoots {
    /// The conventional layout below one base directory: `maps/`,
    /// `rulesets/` and `recordings/`.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            maps: base.join("maps"),
            rulesets: base.join("rulesets"),
            recordings: base.join("recordings"),
        }
    }

    /// Parse roots from a JSON object with `maps`, `rulesets` and
    /// `recordings` keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read roots from a JSON file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn map_path(&self, name: &str) -> PathBuf {
        self.maps.join(format!("{name}.json"))
    }

    pub fn ruleset_path(&self, name: &str) -> PathBuf {
        self.rulesets.join(format!("{name}.json"))
    }

    pub fn recording_path(&self, name: &str) -> PathBuf {
        self.recordings.join(format!("{name}.rec"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
