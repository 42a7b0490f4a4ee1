//! Sets of observer identities.
//!
//! A [`Vision`] is attached to every board cell ("who may currently perceive
//! this cell") and to every entry of a change log ("who was allowed to see
//! this change when it happened"). The universe is the eleven [`Player`]
//! identities, so the set is a `u16` bitmask and every operation is a pure,
//! infallible bit operation.
//!
//! # Example
//!
//! ```
//! use umbra_board::player::Player;
//! use umbra_board::vision::Vision;
//!
//! let mut v = Vision::of(Player::Red);
//! v.add(Player::Blue);
//! assert!(v.contains(Player::Blue));
//! v.remove(Player::Red);
//! assert_eq!(v.iter().collect::<Vec<_>>(), vec![Player::Blue]);
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::player::Player;

/// A set of [`Player`] identities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Vision {
    bits: u16,
}

impl Vision {
    const MASK: u16 = (1 << Player::COUNT) - 1;

    /// The empty set.
    pub const fn none() -> Self {
        Self { bits: 0 }
    }

    /// A set containing only `player`.
    pub fn of(player: Player) -> Self {
        Self {
            bits: 1 << player.index(),
        }
    }

    /// Every identity, including blind, observer and self.
    pub const fn everyone() -> Self {
        Self { bits: Self::MASK }
    }

    /// The eight player colors.
    pub const fn colors() -> Self {
        Self { bits: 0x00ff }
    }

    /// Raw bitmask, one bit per [`Player::index`].
    pub fn bits(self) -> u16 {
        self.bits
    }

    /// Build from a raw bitmask. Bits beyond the identity universe are
    /// discarded.
    pub fn from_bits(bits: u16) -> Self {
        Self {
            bits: bits & Self::MASK,
        }
    }

    pub fn add(&mut self, player: Player) {
        self.bits |= 1 << player.index();
    }

    pub fn remove(&mut self, player: Player) {
        self.bits &= !(1 << player.index());
    }

    pub fn contains(self, player: Player) -> bool {
        self.bits & (1 << player.index()) != 0
    }

    /// Overwrite this set with `other`.
    pub fn replace(&mut self, other: Vision) {
        self.bits = other.bits;
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    #[must_use]
    pub fn union(self, other: Vision) -> Vision {
        Vision {
            bits: self.bits | other.bits,
        }
    }

    #[must_use]
    pub fn intersection(self, other: Vision) -> Vision {
        Vision {
            bits: self.bits & other.bits,
        }
    }

    #[must_use]
    pub fn difference(self, other: Vision) -> Vision {
        Vision {
            bits: self.bits & !other.bits,
        }
    }

    /// Members in identity-index order.
    pub fn iter(self) -> impl Iterator<Item = Player> {
        Player::ALL
            .into_iter()
            .filter(move |p| self.contains(*p))
    }

    /// Apply `f` to every member.
    #[must_use]
    pub fn map(self, f: impl Fn(Player) -> Player) -> Vision {
        self.iter().map(f).collect()
    }

    /// The set as seen by the owner of `color`: `color` becomes
    /// [`Player::Myself`].
    #[must_use]
    pub fn with_self(self, color: Player) -> Vision {
        self.map(|p| p.framed(color))
    }
}

impl FromIterator<Player> for Vision {
    fn from_iter<I: IntoIterator<Item = Player>>(iter: I) -> Self {
        let mut v = Vision::none();
        for p in iter {
            v.add(p);
        }
        v
    }
}

impl From<Player> for Vision {
    fn from(player: Player) -> Self {
        Vision::of(player)
    }
}

impl fmt::Debug for Vision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for Vision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Vision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let players = Vec::<Player>::deserialize(deserializer)?;
        Ok(players.into_iter().collect())
    }
}
