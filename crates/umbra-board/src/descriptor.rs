//! Descriptors name the board slot a change concerns.
//!
//! A [`Descriptor`] is a position plus a [`DescriptorKind`]: the whole cell,
//! its tile, or one of its unit layers (ground, air, bypass). Two changes
//! with equal descriptors refer to the same logical slot.
//!
//! Wire form: `{"type":"ground","row":2,"col":3}`. The none descriptor is
//! `{"type":"none"}` and carries no position.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// What part of a cell a [`Descriptor`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    #[default]
    None,
    Cell,
    Tile,
    Ground,
    Air,
    Bypass,
}

/// A (kind, position) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "DescriptorWire", try_from = "DescriptorWire")]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub position: Position,
}

impl Descriptor {
    /// The none descriptor. Its position is always the origin.
    pub const NONE: Descriptor = Descriptor {
        kind: DescriptorKind::None,
        position: Position::new(0, 0),
    };

    pub fn new(kind: DescriptorKind, position: Position) -> Self {
        if kind == DescriptorKind::None {
            return Self::NONE;
        }
        Self { kind, position }
    }

    pub fn cell(position: Position) -> Self {
        Self::new(DescriptorKind::Cell, position)
    }

    pub fn tile(position: Position) -> Self {
        Self::new(DescriptorKind::Tile, position)
    }

    pub fn ground(position: Position) -> Self {
        Self::new(DescriptorKind::Ground, position)
    }

    pub fn air(position: Position) -> Self {
        Self::new(DescriptorKind::Air, position)
    }

    pub fn bypass(position: Position) -> Self {
        Self::new(DescriptorKind::Bypass, position)
    }

    pub fn is_none(&self) -> bool {
        self.kind == DescriptorKind::None
    }

    /// True for ground, air and bypass descriptors.
    pub fn is_unit(&self) -> bool {
        matches!(
            self.kind,
            DescriptorKind::Ground | DescriptorKind::Air | DescriptorKind::Bypass
        )
    }

    pub fn is_tile(&self) -> bool {
        self.kind == DescriptorKind::Tile
    }

    /// The same slot kind at another position.
    #[must_use]
    pub fn moved_to(&self, position: Position) -> Descriptor {
        Self::new(self.kind, position)
    }

    /// Ordering weight of the layer within a cell: tile first, then ground,
    /// then air and bypass.
    pub fn layer_rank(&self) -> u8 {
        match self.kind {
            DescriptorKind::None => 0,
            DescriptorKind::Cell => 1,
            DescriptorKind::Tile => 2,
            DescriptorKind::Ground => 3,
            DescriptorKind::Air => 4,
            DescriptorKind::Bypass => 5,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct DescriptorWire {
    #[serde(rename = "type")]
    kind: DescriptorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    col: Option<i16>,
}

impl From<Descriptor> for DescriptorWire {
    fn from(d: Descriptor) -> Self {
        if d.is_none() {
            DescriptorWire {
                kind: DescriptorKind::None,
                row: None,
                col: None,
            }
        } else {
            DescriptorWire {
                kind: d.kind,
                row: Some(d.position.row),
                col: Some(d.position.col),
            }
        }
    }
}

impl TryFrom<DescriptorWire> for Descriptor {
    type Error = String;

    fn try_from(w: DescriptorWire) -> Result<Self, Self::Error> {
        match (w.kind, w.row, w.col) {
            (DescriptorKind::None, _, _) => Ok(Descriptor::NONE),
            (kind, Some(row), Some(col)) => Ok(Descriptor::new(kind, Position { row, col })),
            (kind, _, _) => Err(format!("{kind:?} descriptor without row/col")),
        }
    }
}
