//! Cell contents: one tile, up to three unit layers, and hazard fields.

use serde::{Deserialize, Serialize};

use crate::descriptor::DescriptorKind;
use crate::token::{TileToken, UnitToken};

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &i8) -> bool {
    *n == 0
}

// ---------------------------------------------------------------------------
// Hazards
// ---------------------------------------------------------------------------

/// Environmental state of a cell. Every field is omitted from the wire form
/// when it holds its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hazards {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub gas: i8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub radiation: i8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub temperature: i8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub humidity: i8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub chaos: i8,
    #[serde(default, skip_serializing_if = "is_false")]
    pub snow: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub frostbite: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub firestorm: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bonedrought: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub death: bool,
}

impl Hazards {
    pub fn is_default(&self) -> bool {
        *self == Hazards::default()
    }
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// Everything stored at one board position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, skip_serializing_if = "TileToken::is_default")]
    pub tile: TileToken,
    #[serde(default, skip_serializing_if = "UnitToken::is_default")]
    pub ground: UnitToken,
    #[serde(default, skip_serializing_if = "UnitToken::is_default")]
    pub air: UnitToken,
    #[serde(default, skip_serializing_if = "UnitToken::is_default")]
    pub bypass: UnitToken,
    #[serde(flatten)]
    pub hazards: Hazards,
    #[serde(default, skip_serializing_if = "is_false")]
    pub border: bool,
}

impl Cell {
    /// The unit in the layer named by `kind`, or `None` for non-unit kinds.
    pub fn unit(&self, kind: DescriptorKind) -> Option<&UnitToken> {
        match kind {
            DescriptorKind::Ground => Some(&self.ground),
            DescriptorKind::Air => Some(&self.air),
            DescriptorKind::Bypass => Some(&self.bypass),
            _ => None,
        }
    }

    pub fn unit_mut(&mut self, kind: DescriptorKind) -> Option<&mut UnitToken> {
        match kind {
            DescriptorKind::Ground => Some(&mut self.ground),
            DescriptorKind::Air => Some(&mut self.air),
            DescriptorKind::Bypass => Some(&mut self.bypass),
            _ => None,
        }
    }

    /// Occupied unit layers with their kinds.
    pub fn units(&self) -> impl Iterator<Item = (DescriptorKind, &UnitToken)> {
        [
            (DescriptorKind::Ground, &self.ground),
            (DescriptorKind::Air, &self.air),
            (DescriptorKind::Bypass, &self.bypass),
        ]
        .into_iter()
        .filter(|(_, u)| !u.is_none())
    }

    /// Drop all unit layers.
    pub fn forget_units(&mut self) {
        self.ground = UnitToken::default();
        self.air = UnitToken::default();
        self.bypass = UnitToken::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::Player;
    use crate::token::{TileType, UnitType};

    #[test]
    fn default_cell_is_empty_object() {
        assert_eq!(serde_json::to_string(&Cell::default()).unwrap(), "{}");
    }

    #[test]
    fn hazards_are_flattened_and_sparse() {
        let mut cell = Cell::default();
        cell.tile = TileToken::new(TileType::new("grass"), None, 0, 0);
        cell.hazards.gas = 2;
        cell.hazards.snow = true;
        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"tile":{"type":"grass"},"gas":2,"snow":true}"#);
        let back: Cell = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn unit_layers_by_kind() {
        let mut cell = Cell::default();
        cell.air = UnitToken::new(UnitType::new("zeppelin"), Some(Player::Blue), 1);
        assert!(cell.unit(DescriptorKind::Air).is_some_and(|u| !u.is_none()));
        assert!(cell.unit(DescriptorKind::Tile).is_none());
        assert_eq!(cell.units().count(), 1);
        cell.forget_units();
        assert_eq!(cell.units().count(), 0);
    }
}
