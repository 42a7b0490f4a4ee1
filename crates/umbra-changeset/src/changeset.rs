//! Per-step change logs and their per-observer projections.
//!
//! A [`ChangeSet`] accumulates the [`Change`]s emitted during one automaton
//! step, each paired with the [`Vision`] of "who could see this" captured at
//! the moment of emission. Consumers call [`ChangeSet::get`] with their
//! identity to obtain the subsequence they are allowed to see:
//!
//! 1. [`Player::Observer`] gets every entry unchanged.
//! 2. An entry whose vision contains the observer (or contains
//!    [`Player::Myself`] when the observer is the set's addressee) is
//!    included.
//! 3. An observer in the entry's glimpse sees the target but not the
//!    subject and gets [`Change::glimpsed`], with the subject blanked.
//! 4. Any other entry is reduced by [`Change::redacted`], which keeps fog,
//!    geometry and public bookkeeping and drops everything else.
//!
//! For color observers every included change is framed: each occurrence of
//! the observer's color becomes [`Player::Myself`], so a replica sees itself
//! the same way whichever color it plays.
//!
//! `get` is pure and never reorders; the result is always a subsequence of
//! the log.
//!
//! # Example
//!
//! ```
//! use umbra_board::prelude::*;
//! use umbra_changeset::changeset::ChangeSet;
//!
//! let cell = Position::new(2, 3);
//! let mut set = ChangeSet::new();
//! set.push(
//!     Change::Entered {
//!         subject: Descriptor::ground(cell),
//!         unit: UnitToken::new(UnitType::new("tank"), Some(Player::Blue), 1),
//!     },
//!     [Player::Blue, Player::Observer].into_iter().collect(),
//! );
//! set.push(Change::Year { year: 2 }, Vision::everyone());
//!
//! assert_eq!(set.get(Player::Observer).len(), 2);
//! assert_eq!(set.get(Player::Red), vec![Change::Year { year: 2 }]);
//! ```

use serde::{Deserialize, Serialize};
use umbra_board::change::Change;
use umbra_board::player::Player;
use umbra_board::vision::Vision;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One logged change with the vision snapshot taken when it was emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub change: Change,
    pub vision: Vision,
    /// Observers who see the target of the change but not its subject.
    /// They get [`Change::glimpsed`] instead of the redacted form.
    #[serde(default, skip_serializing_if = "is_empty_vision")]
    pub glimpse: Vision,
}

fn is_empty_vision(vision: &Vision) -> bool {
    vision.is_empty()
}

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// An ordered log of (change, vision) entries from one automaton step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    entries: Vec<Entry>,
    /// The consumer this set was built for, if any. Entries visible to
    /// [`Player::Myself`] are visible to the addressee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    addressee: Option<Player>,
}

impl ChangeSet {
    /// Create a new, empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set addressed to one consumer.
    pub fn addressed_to(player: Player) -> Self {
        Self {
            entries: Vec::new(),
            addressee: Some(player),
        }
    }

    pub fn addressee(&self) -> Option<Player> {
        self.addressee
    }

    /// Append a change. `vision` must be the set of observers who could see
    /// it at emission time.
    pub fn push(&mut self, change: Change, vision: Vision) {
        self.push_glimpsed(change, vision, Vision::none());
    }

    /// Append a change whose subject is seen by `vision` while `glimpse`
    /// sees only its target.
    pub fn push_glimpsed(&mut self, change: Change, vision: Vision, glimpse: Vision) {
        let glimpse = glimpse.difference(vision);
        self.entries.push(Entry {
            change,
            vision,
            glimpse,
        });
    }

    /// Append every entry of `other`, keeping order.
    pub fn extend(&mut self, other: ChangeSet) {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in emission order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Entries whose change carries the given wire name.
    pub fn entries_named<'a>(&'a self, wire_name: &'a str) -> impl Iterator<Item = &'a Entry> {
        self.entries
            .iter()
            .filter(move |e| e.change.wire_name() == wire_name)
    }

    /// Whether `observer` may see `entry` unredacted.
    pub fn can_see(&self, entry: &Entry, observer: Player) -> bool {
        observer == Player::Observer
            || entry.vision.contains(observer)
            || (entry.vision.contains(Player::Myself) && self.addressee == Some(observer))
    }

    /// The subsequence of changes `observer` is allowed to see, redacted and
    /// framed for that observer.
    pub fn get(&self, observer: Player) -> Vec<Change> {
        if observer == Player::Observer {
            return self.entries.iter().map(|e| e.change.clone()).collect();
        }

        let frame = |change: Change| {
            if observer.is_color() {
                change.players_mapped(|p| p.framed(observer))
            } else {
                change
            }
        };

        self.entries
            .iter()
            .filter_map(|entry| {
                if self.can_see(entry, observer) {
                    Some(frame(entry.change.clone()))
                } else if entry.glimpse.contains(observer) {
                    entry.change.glimpsed().map(&frame)
                } else {
                    entry.change.redacted().map(&frame)
                }
            })
            .collect()
    }

    /// The projection for `observer` as a JSON array, the payload that
    /// crosses the wire.
    pub fn encode_for(&self, observer: Player) -> String {
        let values: Vec<serde_json::Value> =
            self.get(observer).iter().map(Change::to_value).collect();
        serde_json::Value::Array(values).to_string()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
