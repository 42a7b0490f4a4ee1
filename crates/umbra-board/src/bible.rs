//! Ruleset ("bible") data and the query interface the engine calls into.
//!
//! A [`Bible`] is configuration, not engine logic: it names the tile and unit
//! types, bounds every numeric field, and carries the handful of rule
//! parameters the automaton consults (costs, vision radii, abilities, the
//! deterministic scan order for simultaneous orders). Rulesets are loaded
//! from JSON; [`Bible::standard`] builds the ruleset used by tests and by
//! tools when no ruleset file is given.
//!
//! # Example
//!
//! ```
//! use umbra_board::bible::Bible;
//!
//! let bible = Bible::standard();
//! let city = bible.tiletype("city").unwrap();
//! assert!(bible.tile(&city).unwrap().binding);
//! assert!(bible.unittype("dragon").is_none());
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::change::Change;
use crate::position::{Position, MAX_COLS, MAX_ROWS};
use crate::token::{TileType, UnitType};
use crate::ParseError;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to load a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("failed to read ruleset '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ruleset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ruleset '{name}' is inconsistent: {details}")]
    Invalid { name: String, details: String },
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// Deterministic order in which simultaneous orders are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrder {
    /// Row by row, left to right.
    #[default]
    RowMajor,
    /// Column by column, top to bottom.
    ColumnMajor,
}

impl ScanOrder {
    /// Sort key of `pos` under this order.
    pub fn key(self, pos: Position) -> (i16, i16) {
        match self {
            ScanOrder::RowMajor => (pos.row, pos.col),
            ScanOrder::ColumnMajor => (pos.col, pos.row),
        }
    }
}

/// Numeric bounds applied by the board to every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    pub tile_stacks_max: u8,
    pub tile_power_max: u8,
    pub unit_stacks_max: u8,
    pub gas_min: i8,
    pub gas_max: i8,
    pub radiation_min: i8,
    pub radiation_max: i8,
    pub temperature_min: i8,
    pub temperature_max: i8,
    pub humidity_min: i8,
    pub humidity_max: i8,
    pub chaos_min: i8,
    pub chaos_max: i8,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            tile_stacks_max: 5,
            tile_power_max: 5,
            unit_stacks_max: 5,
            gas_min: 0,
            gas_max: 3,
            radiation_min: 0,
            radiation_max: 3,
            temperature_min: -5,
            temperature_max: 5,
            humidity_min: 0,
            humidity_max: 5,
            chaos_min: 0,
            chaos_max: 5,
        }
    }
}

fn yes() -> bool {
    true
}

/// Rules for one tile type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileDef {
    pub name: TileType,
    #[serde(default)]
    pub stacks_max: u8,
    #[serde(default)]
    pub power_max: u8,
    /// Vision radius granted to the owner.
    #[serde(default)]
    pub vision: u16,
    /// Income per point of power, paid each round.
    #[serde(default)]
    pub income: i32,
    /// Score contributed to the owner each round.
    #[serde(default)]
    pub score: i32,
    /// A player who owns no binding tile is defeated.
    #[serde(default)]
    pub binding: bool,
    /// Gains a stack (and a power) each growth step while under its maximum.
    #[serde(default)]
    pub grows: bool,
    #[serde(default = "yes")]
    pub walkable: bool,
    #[serde(default)]
    pub produces: Vec<UnitType>,
    #[serde(default)]
    pub upgrades: Vec<TileType>,
    #[serde(default)]
    pub expands: Vec<TileType>,
    #[serde(default)]
    pub cultivates: Vec<TileType>,
    /// Price paid when this tile is built by expand, upgrade, cultivate,
    /// shape or settle.
    #[serde(default)]
    pub cost: i32,
    /// Type left behind when the tile is destroyed.
    #[serde(default)]
    pub destroyed: Option<TileType>,
}

/// Abilities a unit type may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Abilities {
    #[serde(default)]
    pub capture: bool,
    #[serde(default)]
    pub focus: bool,
    #[serde(default)]
    pub shell: bool,
    #[serde(default)]
    pub bombard: bool,
    #[serde(default)]
    pub bomb: bool,
    #[serde(default)]
    pub trample: bool,
}

/// Rules for one unit type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDef {
    pub name: UnitType,
    pub stacks_max: u8,
    pub speed: u8,
    #[serde(default)]
    pub vision: u16,
    /// Air units occupy the air layer; everything else the ground layer.
    #[serde(default)]
    pub air: bool,
    /// Hits dealt per stack.
    #[serde(default)]
    pub attack: u8,
    /// Reach of focus, shell and bombard orders.
    #[serde(default)]
    pub range: u16,
    #[serde(default)]
    pub abilities: Abilities,
    #[serde(default)]
    pub shapes: Vec<TileType>,
    #[serde(default)]
    pub settles: Vec<TileType>,
    #[serde(default)]
    pub cost: i32,
}

// ---------------------------------------------------------------------------
// Bible
// ---------------------------------------------------------------------------

/// A complete ruleset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bible {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub scan_order: ScanOrder,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub starting_funds: i32,
    /// Winter cells at or below this temperature get snow.
    #[serde(default)]
    pub snow_threshold: i8,
    /// Winter cells at or below this temperature get frostbite.
    #[serde(default)]
    pub frostbite_threshold: i8,
    pub tiles: Vec<TileDef>,
    pub units: Vec<UnitDef>,
}

impl Bible {
    /// Parse and validate a ruleset.
    pub fn from_json(json: &str) -> Result<Bible, RulesetError> {
        let bible: Bible = serde_json::from_str(json)?;
        bible.validate()?;
        Ok(bible)
    }

    /// Read, parse and validate a ruleset file.
    pub fn load(path: &Path) -> Result<Bible, RulesetError> {
        let text = std::fs::read_to_string(path).map_err(|source| RulesetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The built-in ruleset.
    pub fn standard() -> Bible {
        let t = TileType::new;
        let u = UnitType::new;
        let tile = |name: &str| TileDef {
            name: TileType::new(name),
            stacks_max: 0,
            power_max: 0,
            vision: 0,
            income: 0,
            score: 0,
            binding: false,
            grows: false,
            walkable: true,
            produces: Vec::new(),
            upgrades: Vec::new(),
            expands: Vec::new(),
            cultivates: Vec::new(),
            cost: 0,
            destroyed: None,
        };
        let unit = |name: &str, stacks_max: u8, speed: u8| UnitDef {
            name: UnitType::new(name),
            stacks_max,
            speed,
            vision: 1,
            air: false,
            attack: 0,
            range: 0,
            abilities: Abilities::default(),
            shapes: Vec::new(),
            settles: Vec::new(),
            cost: 0,
        };

        let tiles = vec![
            tile("grass"),
            tile("forest"),
            TileDef {
                walkable: false,
                ..tile("mountain")
            },
            TileDef {
                walkable: false,
                ..tile("water")
            },
            tile("rubble"),
            TileDef {
                stacks_max: 5,
                power_max: 5,
                vision: 2,
                income: 1,
                score: 3,
                binding: true,
                grows: true,
                produces: vec![u("rifleman"), u("tank"), u("cannon"), u("zeppelin"), u("settler")],
                expands: vec![t("town")],
                cost: 40,
                destroyed: Some(t("rubble")),
                ..tile("city")
            },
            TileDef {
                stacks_max: 3,
                power_max: 3,
                vision: 1,
                income: 1,
                score: 1,
                binding: true,
                grows: true,
                produces: vec![u("rifleman"), u("settler")],
                upgrades: vec![t("city")],
                cultivates: vec![t("farm")],
                cost: 15,
                destroyed: Some(t("rubble")),
                ..tile("town")
            },
            TileDef {
                stacks_max: 1,
                power_max: 1,
                vision: 1,
                income: 2,
                score: 1,
                cost: 5,
                destroyed: Some(t("grass")),
                ..tile("farm")
            },
        ];

        let units = vec![
            UnitDef {
                attack: 1,
                range: 1,
                abilities: Abilities {
                    capture: true,
                    focus: true,
                    ..Abilities::default()
                },
                cost: 5,
                ..unit("rifleman", 3, 1)
            },
            UnitDef {
                attack: 2,
                range: 1,
                abilities: Abilities {
                    focus: true,
                    trample: true,
                    ..Abilities::default()
                },
                cost: 15,
                ..unit("tank", 3, 2)
            },
            UnitDef {
                attack: 1,
                range: 3,
                abilities: Abilities {
                    shell: true,
                    ..Abilities::default()
                },
                cost: 15,
                ..unit("cannon", 2, 1)
            },
            UnitDef {
                vision: 2,
                air: true,
                attack: 1,
                range: 2,
                abilities: Abilities {
                    bomb: true,
                    bombard: true,
                    ..Abilities::default()
                },
                cost: 25,
                ..unit("zeppelin", 1, 1)
            },
            UnitDef {
                shapes: vec![t("farm")],
                settles: vec![t("town")],
                cost: 10,
                ..unit("settler", 1, 1)
            },
        ];

        Bible {
            name: "standard".to_owned(),
            version: "1.0".to_owned(),
            scan_order: ScanOrder::RowMajor,
            limits: Limits::default(),
            starting_funds: 20,
            snow_threshold: 0,
            frostbite_threshold: -2,
            tiles,
            units,
        }
    }

    // -- Lookups ------------------------------------------------------------

    /// The tile type called `name`, if the ruleset defines it.
    pub fn tiletype(&self, name: &str) -> Option<TileType> {
        self.tiles
            .iter()
            .find(|d| d.name.as_str() == name)
            .map(|d| d.name.clone())
    }

    /// The unit type called `name`, if the ruleset defines it.
    pub fn unittype(&self, name: &str) -> Option<UnitType> {
        self.units
            .iter()
            .find(|d| d.name.as_str() == name)
            .map(|d| d.name.clone())
    }

    pub fn tile(&self, kind: &TileType) -> Option<&TileDef> {
        self.tiles.iter().find(|d| &d.name == kind)
    }

    pub fn unit(&self, kind: &UnitType) -> Option<&UnitDef> {
        self.units.iter().find(|d| &d.name == kind)
    }

    // -- Limits -------------------------------------------------------------

    pub fn tile_stacks_max(&self, kind: &TileType) -> u8 {
        self.tile(kind)
            .map_or(0, |d| d.stacks_max)
            .min(self.limits.tile_stacks_max)
    }

    pub fn tile_power_max(&self, kind: &TileType) -> u8 {
        self.tile(kind)
            .map_or(0, |d| d.power_max)
            .min(self.limits.tile_power_max)
    }

    pub fn unit_stacks_max(&self, kind: &UnitType) -> u8 {
        self.unit(kind)
            .map_or(0, |d| d.stacks_max)
            .min(self.limits.unit_stacks_max)
    }

    pub fn gas_min(&self) -> i8 {
        self.limits.gas_min
    }

    pub fn gas_max(&self) -> i8 {
        self.limits.gas_max
    }

    pub fn radiation_min(&self) -> i8 {
        self.limits.radiation_min
    }

    pub fn radiation_max(&self) -> i8 {
        self.limits.radiation_max
    }

    pub fn temperature_min(&self) -> i8 {
        self.limits.temperature_min
    }

    pub fn temperature_max(&self) -> i8 {
        self.limits.temperature_max
    }

    pub fn humidity_min(&self) -> i8 {
        self.limits.humidity_min
    }

    pub fn humidity_max(&self) -> i8 {
        self.limits.humidity_max
    }

    pub fn chaos_min(&self) -> i8 {
        self.limits.chaos_min
    }

    pub fn chaos_max(&self) -> i8 {
        self.limits.chaos_max
    }

    // -- Validation ---------------------------------------------------------

    /// Check that every type name `change` mentions exists in this ruleset.
    pub fn check_change(&self, change: &Change) -> Result<(), ParseError> {
        for kind in change.tile_types() {
            if !kind.is_none() && self.tile(kind).is_none() {
                return Err(ParseError::UnknownTileType {
                    name: kind.to_string(),
                });
            }
        }
        for kind in change.unit_types() {
            if !kind.is_none() && self.unit(kind).is_none() {
                return Err(ParseError::UnknownUnitType {
                    name: kind.to_string(),
                });
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), RulesetError> {
        let invalid = |details: String| RulesetError::Invalid {
            name: self.name.clone(),
            details,
        };

        for (i, def) in self.tiles.iter().enumerate() {
            if def.name.is_none() {
                return Err(invalid(format!("tile #{i} has an empty name")));
            }
            if self.tiles[..i].iter().any(|d| d.name == def.name) {
                return Err(invalid(format!("tile '{}' defined twice", def.name)));
            }
            let tile_refs = def
                .upgrades
                .iter()
                .chain(&def.expands)
                .chain(&def.cultivates)
                .chain(&def.destroyed);
            for r in tile_refs {
                if self.tile(r).is_none() {
                    return Err(invalid(format!("tile '{}' refers to unknown tile '{r}'", def.name)));
                }
            }
            for r in &def.produces {
                if self.unit(r).is_none() {
                    return Err(invalid(format!("tile '{}' produces unknown unit '{r}'", def.name)));
                }
            }
        }

        for (i, def) in self.units.iter().enumerate() {
            if def.name.is_none() {
                return Err(invalid(format!("unit #{i} has an empty name")));
            }
            if self.units[..i].iter().any(|d| d.name == def.name) {
                return Err(invalid(format!("unit '{}' defined twice", def.name)));
            }
            for r in def.shapes.iter().chain(&def.settles) {
                if self.tile(r).is_none() {
                    return Err(invalid(format!("unit '{}' builds unknown tile '{r}'", def.name)));
                }
            }
        }

        let l = &self.limits;
        let ranges = [
            ("gas", l.gas_min, l.gas_max),
            ("radiation", l.radiation_min, l.radiation_max),
            ("temperature", l.temperature_min, l.temperature_max),
            ("humidity", l.humidity_min, l.humidity_max),
            ("chaos", l.chaos_min, l.chaos_max),
        ];
        for (field, min, max) in ranges {
            if min > max {
                return Err(invalid(format!("{field} range {min}..{max} is empty")));
            }
        }

        // Every vision radius must fit on the largest board.
        let largest = (MAX_ROWS + MAX_COLS) as u16;
        if let Some(def) = self.units.iter().find(|d| d.vision > largest) {
            return Err(invalid(format!("unit '{}' vision radius {} is too large", def.name, def.vision)));
        }

        Ok(())
    }
}
