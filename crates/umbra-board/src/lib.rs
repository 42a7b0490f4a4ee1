//! Umbra Board -- the change vocabulary and the grid it mutates.
//!
//! This crate holds the data side of the umbra synchronization engine:
//! observer identities ([`player::Player`]) and sets of them
//! ([`vision::Vision`]), board geometry, tokens and cells, the ruleset query
//! interface ([`bible::Bible`]), the closed [`change::Change`] vocabulary
//! with its wire format, and the [`board::Board`] whose
//! [`enact`](board::Board::enact) is the single entrypoint for every state
//! mutation.
//!
//! The same `Board` type serves as the authoritative board and as each
//! consumer's local replica; the two differ only in their perspective and in
//! which changes they are fed.
//!
//! # Quick Start
//!
//! ```
//! use umbra_board::prelude::*;
//!
//! let bible = Bible::standard();
//! let mut replica = Board::new(&bible, Player::Myself);
//!
//! let wire = r#"[
//!     {"type":"corner","subject":{"type":"cell","row":1,"col":1}},
//!     {"type":"reveal","subject":{"type":"cell","row":0,"col":1},
//!      "cell":{"tile":{"type":"city","owner":"self","stacks":2,"power":2}},
//!      "vision":["self","observer"]}
//! ]"#;
//! for change in Change::parse_changes(wire).unwrap() {
//!     replica.enact(&change);
//! }
//! assert!(replica.perceives(Position::new(0, 1)));
//! assert_eq!(replica.tile(Position::new(0, 1)).owner, Some(Player::Myself));
//! ```

#![deny(unsafe_code)]

pub mod bible;
pub mod board;
pub mod cell;
pub mod change;
pub mod descriptor;
pub mod phase;
pub mod player;
pub mod position;
pub mod token;
pub mod vision;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Malformed wire data or an unknown tag or enum value.
///
/// Parse failures are recoverable at message granularity: the caller logs
/// and drops the offending message and carries on with the next one.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` tag names no known change.
    #[error("unknown change type '{tag}'")]
    UnknownType { tag: String },

    #[error("unknown player '{name}'")]
    UnknownPlayer { name: String },

    #[error("unknown tile type '{name}'")]
    UnknownTileType { name: String },

    #[error("unknown unit type '{name}'")]
    UnknownUnitType { name: String },

    /// A required field is missing or has the wrong shape.
    #[error("malformed '{tag}' change: {details}")]
    Malformed { tag: String, details: String },
}

impl ParseError {
    pub(crate) fn malformed(tag: &str, err: &serde_json::Error) -> Self {
        ParseError::Malformed {
            tag: tag.to_owned(),
            details: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::bible::{Abilities, Bible, Limits, RulesetError, ScanOrder, TileDef, UnitDef};
    pub use crate::board::Board;
    pub use crate::cell::{Cell, Hazards};
    pub use crate::change::{Change, Hit};
    pub use crate::descriptor::{Descriptor, DescriptorKind};
    pub use crate::phase::{Daytime, Phase, Season};
    pub use crate::player::Player;
    pub use crate::position::{Move, Position, MAX_COLS, MAX_ROWS};
    pub use crate::token::{TileToken, TileType, UnitToken, UnitType};
    pub use crate::vision::Vision;
    pub use crate::ParseError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
