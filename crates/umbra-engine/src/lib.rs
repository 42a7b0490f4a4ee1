//! Umbra Engine -- the authoritative turn-cycle automaton.
//!
//! This crate drives an authoritative [`Board`](umbra_board::board::Board)
//! through the phases of a round and hands back every step's
//! [`ChangeSet`](umbra_changeset::ChangeSet). Consumers project each set for
//! their own identity and enact the result on their replica boards.
//!
//! A live round looks like this:
//!
//! 1. [`Automaton::act`] drains the setup work or the action phase, one unit
//!    of work per call, while [`Automaton::active`] is true.
//! 2. [`Automaton::hibernate`] closes the round: calendar, income, scores,
//!    defeat and victory.
//! 3. Players submit orders with [`Automaton::receive`].
//! 4. [`Automaton::awake`] re-arms the round and [`Automaton::prepare`] locks
//!    the orders in scan order and starts the action phase.
//!
//! # Quick Start
//!
//! ```
//! use umbra_engine::prelude::*;
//!
//! let bible = Bible::standard();
//! let mut map = Map::filled("duel", 5, 5, bible.tiletype("grass").unwrap());
//! map.cell_mut(Position::new(0, 0)).unwrap().tile =
//!     TileToken::new(bible.tiletype("city").unwrap(), Some(Player::Red), 2, 2);
//! map.cell_mut(Position::new(4, 4)).unwrap().tile =
//!     TileToken::new(bible.tiletype("city").unwrap(), Some(Player::Blue), 2, 2);
//!
//! let mut automaton = Automaton::new(
//!     &bible,
//!     vec![Player::Red, Player::Blue],
//!     AutomatonConfig::default(),
//! );
//! automaton.load(&map).unwrap();
//!
//! let setup = automaton.act().unwrap();
//! assert_eq!(automaton.phase(), Phase::Resting);
//!
//! // Red only sees its own corner of the board.
//! let mut red = Board::new(&bible, Player::Myself);
//! for change in setup.get(Player::Red) {
//!     red.enact(&change);
//! }
//! assert_eq!(red.tile(Position::new(0, 0)).owner, Some(Player::Myself));
//! assert!(red.tile(Position::new(4, 4)).is_none());
//! ```

#![deny(unsafe_code)]

pub mod automaton;
pub mod challenge;
pub mod config;
pub mod map;
pub mod order;
pub mod sight;

use std::path::PathBuf;

use umbra_board::bible::RulesetError;
use umbra_changeset::RecordingError;

pub use automaton::{Automaton, AutomatonError, Calendar, Receipt};

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the board crate for convenience.
pub use umbra_board;

/// Re-export the change set crate for convenience.
pub use umbra_changeset;

// ---------------------------------------------------------------------------
// LoadError
// ---------------------------------------------------------------------------

/// Failure to load a resource the automaton needs before it can run: a map,
/// a ruleset, a recording or the resource roots themselves.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("'{path}' is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("map '{name}' is invalid: {details}")]
    InvalidMap { name: String, details: String },

    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Everything a replica needs.
    pub use umbra_board::prelude::*;
    pub use umbra_changeset::{ChangeSet, Entry, Metadata, Recording, RecordingError, RecordingWriter};

    // Engine-specific exports.
    pub use crate::automaton::{Automaton, AutomatonError, Calendar, Receipt};
    pub use crate::challenge::Challenge;
    pub use crate::config::{AutomatonConfig, ResourceRoots};
    pub use crate::map::Map;
    pub use crate::order::{Order, OrderError};
    pub use crate::LoadError;
}
