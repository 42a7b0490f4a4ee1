//! Observer identities.
//!
//! A [`Player`] is one of eight colors, or one of the three special
//! identities: [`Player::Blind`] (sees nothing by default),
//! [`Player::Observer`] (sees everything) and [`Player::Myself`], the
//! placeholder for "the owner of the local replica". Changes are framed in
//! terms of `Myself` when they are projected into a player's own stream, so a
//! replica sees itself consistently whichever color it actually plays.
//!
//! # Example
//!
//! ```
//! use umbra_board::player::Player;
//!
//! let p: Player = "teal".parse().unwrap();
//! assert_eq!(p, Player::Teal);
//! assert!(p.is_color());
//! assert_eq!(Player::Myself.to_string(), "self");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ParseError;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One observer identity. The discriminant is the bit index used by
/// [`Vision`](crate::vision::Vision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Player {
    Red = 0,
    Blue = 1,
    Teal = 2,
    Yellow = 3,
    Pink = 4,
    Black = 5,
    Indigo = 6,
    Purple = 7,
    Blind = 8,
    Observer = 9,
    Myself = 10,
}

impl Player {
    /// Number of identities.
    pub const COUNT: usize = 11;

    /// The eight player colors in index order.
    pub const COLORS: [Player; 8] = [
        Player::Red,
        Player::Blue,
        Player::Teal,
        Player::Yellow,
        Player::Pink,
        Player::Black,
        Player::Indigo,
        Player::Purple,
    ];

    /// Every identity in index order.
    pub const ALL: [Player; Player::COUNT] = [
        Player::Red,
        Player::Blue,
        Player::Teal,
        Player::Yellow,
        Player::Pink,
        Player::Black,
        Player::Indigo,
        Player::Purple,
        Player::Blind,
        Player::Observer,
        Player::Myself,
    ];

    /// Bit index of this identity.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Option<Player> {
        Self::ALL.get(index).copied()
    }

    /// True for the eight colors, false for blind/observer/self.
    pub fn is_color(self) -> bool {
        (self as u8) < 8
    }

    /// The stable wire name.
    pub fn name(self) -> &'static str {
        match self {
            Player::Red => "red",
            Player::Blue => "blue",
            Player::Teal => "teal",
            Player::Yellow => "yellow",
            Player::Pink => "pink",
            Player::Black => "black",
            Player::Indigo => "indigo",
            Player::Purple => "purple",
            Player::Blind => "blind",
            Player::Observer => "observer",
            Player::Myself => "self",
        }
    }

    /// Replace `color` by [`Player::Myself`], leaving every other identity
    /// untouched.
    pub fn framed(self, color: Player) -> Player {
        if self == color {
            Player::Myself
        } else {
            self
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Player {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| ParseError::UnknownPlayer {
                name: s.to_owned(),
            })
    }
}

impl Serialize for Player {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Player {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for p in Player::ALL {
            assert_eq!(p.name().parse::<Player>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "orange".parse::<Player>().unwrap_err();
        assert!(matches!(err, ParseError::UnknownPlayer { .. }));
    }

    #[test]
    fn only_colors_are_colors() {
        assert_eq!(Player::ALL.iter().filter(|p| p.is_color()).count(), 8);
        assert!(!Player::Observer.is_color());
        assert!(!Player::Myself.is_color());
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, p) in Player::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(Player::from_index(i), Some(*p));
        }
        assert_eq!(Player::from_index(11), None);
    }

    #[test]
    fn framing_replaces_only_the_given_color() {
        assert_eq!(Player::Blue.framed(Player::Blue), Player::Myself);
        assert_eq!(Player::Red.framed(Player::Blue), Player::Red);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Player::Myself).unwrap();
        assert_eq!(json, "\"self\"");
        let back: Player = serde_json::from_str("\"purple\"").unwrap();
        assert_eq!(back, Player::Purple);
    }
}
