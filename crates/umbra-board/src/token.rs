//! Tile and unit tokens.
//!
//! A token is what occupies one layer of a cell: its ruleset type, owner,
//! stack count and power. Each token also carries a board-local `id` that
//! the [`Board`](crate::board::Board) assigns when the token is placed. Ids
//! exist only so that local consumers can track a token across moves; they
//! are never serialized, never compared and never checksummed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::player::Player;

// ---------------------------------------------------------------------------
// Type names
// ---------------------------------------------------------------------------

macro_rules! type_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// The empty type name ("no token").
            pub const NONE: $name = $name(String::new());

            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_none(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

type_name!(
    /// Name of a tile type as defined by the ruleset.
    TileType
);
type_name!(
    /// Name of a unit type as defined by the ruleset.
    UnitType
);

fn is_zero(n: &u8) -> bool {
    *n == 0
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// The tile layer of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileToken {
    #[serde(rename = "type", default, skip_serializing_if = "TileType::is_none")]
    pub kind: TileType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Player>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub stacks: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub power: u8,
    #[serde(skip)]
    pub id: u32,
}

impl TileToken {
    pub fn new(kind: TileType, owner: Option<Player>, stacks: u8, power: u8) -> Self {
        Self {
            kind,
            owner,
            stacks,
            power,
            id: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is_default(&self) -> bool {
        *self == TileToken::default()
    }
}

impl PartialEq for TileToken {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.owner == other.owner
            && self.stacks == other.stacks
            && self.power == other.power
    }
}

impl Eq for TileToken {}

/// A unit in one of the unit layers (ground, air, bypass) of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitToken {
    #[serde(rename = "type", default, skip_serializing_if = "UnitType::is_none")]
    pub kind: UnitType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Player>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub stacks: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub power: u8,
    #[serde(skip)]
    pub id: u32,
}

impl UnitToken {
    pub fn new(kind: UnitType, owner: Option<Player>, stacks: u8) -> Self {
        Self {
            kind,
            owner,
            stacks,
            power: 0,
            id: 0,
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is_default(&self) -> bool {
        *self == UnitToken::default()
    }
}

impl PartialEq for UnitToken {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.owner == other.owner
            && self.stacks == other.stacks
            && self.power == other.power
    }
}

impl Eq for UnitToken {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_token_serializes_empty() {
        let json = serde_json::to_string(&TileToken::default()).unwrap();
        assert_eq!(json, "{}");
        let back: UnitToken = serde_json::from_str("{}").unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn id_is_ignored_by_equality_and_wire() {
        let mut a = UnitToken::new(UnitType::new("rifleman"), Some(Player::Red), 3);
        let mut b = a.clone();
        a.id = 7;
        b.id = 9;
        assert_eq!(a, b);
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, r#"{"type":"rifleman","owner":"red","stacks":3}"#);
    }

    #[test]
    fn unowned_tile_omits_owner() {
        let t = TileToken::new(TileType::new("grass"), None, 0, 0);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"type":"grass"}"#);
    }
}
