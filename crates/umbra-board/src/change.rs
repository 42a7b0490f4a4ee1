//! The change vocabulary.
//!
//! A [`Change`] describes one atomic, irreversible mutation of game state.
//! Changes are produced by the automaton during a step, or reconstructed by
//! parsing wire data; once constructed they are never modified.
//!
//! Many tags come in pairs: an announcement (`attacks`, `shapes`,
//! `captures`, ...) that carries intent and targeting information for
//! animation, and a resolved counterpart (`attacked`, `shaped`, `captured`,
//! ...) that carries the actual state delta. Only resolved tags mutate a
//! [`Board`](crate::board::Board).
//!
//! # Wire format
//!
//! Every change is a JSON object whose `"type"` key is the stable wire name
//! of the tag. Optional fields are omitted when they hold their default, and
//! absence parses as the default:
//!
//! ```
//! use umbra_board::change::Change;
//! use umbra_board::descriptor::Descriptor;
//! use umbra_board::position::Position;
//!
//! let c = Change::Gas { subject: Descriptor::cell(Position::new(1, 2)), gas: 0 };
//! assert_eq!(c.to_string(), r#"{"type":"gas","subject":{"type":"cell","row":1,"col":2}}"#);
//! assert_eq!(c.to_string().parse::<Change>().unwrap(), c);
//! ```
//!
//! Resolved hits from old recordings may carry the deprecated `dead` and
//! `powered` booleans instead of `killed` and `depowered`; see [`Hit`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::Cell;
use crate::descriptor::{Descriptor, DescriptorKind};
use crate::phase::{Daytime, Phase, Season};
use crate::player::Player;
use crate::token::{TileToken, TileType, UnitToken, UnitType};
use crate::vision::Vision;
use crate::ParseError;

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero_i8(n: &i8) -> bool {
    *n == 0
}

fn is_zero_i16(n: &i16) -> bool {
    *n == 0
}

fn is_zero_i32(n: &i32) -> bool {
    *n == 0
}

fn is_zero_u8(n: &u8) -> bool {
    *n == 0
}

fn is_default_season(season: &Season) -> bool {
    *season == Season::default()
}

fn is_default_daytime(daytime: &Daytime) -> bool {
    *daytime == Daytime::default()
}

fn is_none_descriptor(d: &Descriptor) -> bool {
    d.is_none()
}

fn is_empty_vision(v: &Vision) -> bool {
    v.is_empty()
}

fn is_empty_cell(c: &Cell) -> bool {
    *c == Cell::default()
}

// ---------------------------------------------------------------------------
// Hit
// ---------------------------------------------------------------------------

/// Outcome of one resolved hit (attack, trample, shell, bombard, bomb or a
/// hazard).
///
/// The subject is the slot that was hit. A `cell` subject is a miss.
///
/// Deserialization accepts the deprecated `dead`/`powered` pair when neither
/// `killed` nor `depowered` is present. A tile subject translates to
/// `killed = dead, depowered = !powered`; any other subject translates to
/// `killed = dead, depowered = false`. A missing `powered` counts as true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "HitWire")]
pub struct Hit {
    pub subject: Descriptor,
    #[serde(default, skip_serializing_if = "is_false")]
    pub killed: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub depowered: bool,
}

impl Hit {
    pub fn new(subject: Descriptor, killed: bool, depowered: bool) -> Self {
        Self {
            subject,
            killed,
            depowered,
        }
    }
}

#[derive(Deserialize)]
struct HitWire {
    subject: Descriptor,
    #[serde(default)]
    killed: Option<bool>,
    #[serde(default)]
    depowered: Option<bool>,
    #[serde(default)]
    dead: Option<bool>,
    #[serde(default)]
    powered: Option<bool>,
}

impl From<HitWire> for Hit {
    fn from(w: HitWire) -> Self {
        let modern = w.killed.is_some() || w.depowered.is_some();
        let legacy = w.dead.is_some() || w.powered.is_some();
        if modern || !legacy {
            return Hit::new(
                w.subject,
                w.killed.unwrap_or(false),
                w.depowered.unwrap_or(false),
            );
        }

        let dead = w.dead.unwrap_or(false);
        let powered = w.powered.unwrap_or(true);
        match w.subject.kind {
            DescriptorKind::Tile => Hit::new(w.subject, dead, !powered),
            _ => Hit::new(w.subject, dead, false),
        }
    }
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// One atomic mutation of game state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    // -- Movement -----------------------------------------------------------
    /// A unit begins executing a move order.
    Starts { subject: Descriptor },
    /// A unit moves from `subject` to `target` (same layer).
    Moves { subject: Descriptor, target: Descriptor },
    /// A unit appears at `subject`.
    Entered { subject: Descriptor, unit: UnitToken },
    /// The unit at `subject` disappears from view.
    Exited { subject: Descriptor },
    /// The unit at `subject` is removed from the board.
    Died { subject: Descriptor },
    /// The unit at `subject` survived an attack.
    Survived { subject: Descriptor },

    // -- Fog ----------------------------------------------------------------
    /// Cell contents and vision become known.
    Reveal {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_empty_cell")]
        cell: Cell,
        #[serde(default, skip_serializing_if = "is_empty_vision")]
        vision: Vision,
    },
    /// Cell vision shrinks; contents may be forgotten.
    Obscure {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_empty_vision")]
        vision: Vision,
    },
    /// Cell vision changes without revealing contents.
    Vision {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_empty_vision")]
        vision: Vision,
    },

    // -- Tiles --------------------------------------------------------------
    Transformed {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    /// The token at `subject` is used up.
    Consumed { subject: Descriptor },
    /// The tile at `subject` is razed and replaced by its remnant.
    Destroyed {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Grows {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        stacks: i8,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        power: i8,
    },
    Shapes {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileType::is_none")]
        tiletype: TileType,
    },
    Shaped {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Settles {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileType::is_none")]
        tiletype: TileType,
    },
    Settled {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Expands {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
        #[serde(default, skip_serializing_if = "TileType::is_none")]
        tiletype: TileType,
    },
    Expanded {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Upgrades {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileType::is_none")]
        tiletype: TileType,
    },
    Upgraded {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Cultivates {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
        #[serde(default, skip_serializing_if = "TileType::is_none")]
        tiletype: TileType,
    },
    Cultivated {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "TileToken::is_default")]
        tile: TileToken,
    },
    Captures {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    /// The tile at `subject` changes owner.
    Captured { subject: Descriptor, player: Player },
    Produces {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
        #[serde(default, skip_serializing_if = "UnitType::is_none")]
        unittype: UnitType,
    },
    Produced { subject: Descriptor, unit: UnitToken },

    // -- Combat -------------------------------------------------------------
    Aims {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Attacks {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Attacked(Hit),
    Tramples {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Trampled(Hit),
    Shells {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Shelled(Hit),
    Bombards {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Bombarded(Hit),
    Bombs {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_none_descriptor")]
        target: Descriptor,
    },
    Bombed(Hit),
    Frostbitten(Hit),
    Burned(Hit),
    Gassed(Hit),
    Irradiated(Hit),

    // -- Hazards ------------------------------------------------------------
    Snow {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_false")]
        snow: bool,
    },
    Frostbite {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_false")]
        frostbite: bool,
    },
    Firestorm {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_false")]
        firestorm: bool,
    },
    Bonedrought {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_false")]
        bonedrought: bool,
    },
    Death {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_false")]
        death: bool,
    },
    Gas {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        gas: i8,
    },
    Radiation {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        radiation: i8,
    },
    Temperature {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        temperature: i8,
    },
    Humidity {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        humidity: i8,
    },
    Chaos {
        subject: Descriptor,
        #[serde(default, skip_serializing_if = "is_zero_i8")]
        chaos: i8,
    },

    // -- Bookkeeping --------------------------------------------------------
    Year {
        #[serde(default, skip_serializing_if = "is_zero_i16")]
        year: i16,
    },
    Season {
        #[serde(default, skip_serializing_if = "is_default_season")]
        season: Season,
    },
    Daytime {
        #[serde(default, skip_serializing_if = "is_default_daytime")]
        daytime: Daytime,
    },
    Phase { phase: Phase },
    /// A player's funds are now exactly `money`.
    Funds {
        player: Player,
        #[serde(default, skip_serializing_if = "is_zero_i32")]
        money: i32,
    },
    Income {
        player: Player,
        #[serde(default, skip_serializing_if = "is_zero_i32")]
        money: i32,
    },
    Expenditure {
        player: Player,
        #[serde(default, skip_serializing_if = "is_zero_i32")]
        money: i32,
    },

    // -- Lifecycle ----------------------------------------------------------
    Ordered { player: Player },
    Sleeping { player: Player },
    Acting { player: Player },
    /// The player whose orders resolve first this round.
    Initiative { player: Player },
    Finished { player: Player },
    Discarded { subject: Descriptor },
    Postponed { subject: Descriptor },
    Unfinished { subject: Descriptor },

    // -- Geometry -----------------------------------------------------------
    /// The board's bottom-right cell is `subject`; the board resizes to fit.
    Corner { subject: Descriptor },
    Border { subject: Descriptor },

    // -- Terminal -----------------------------------------------------------
    Scored {
        player: Player,
        #[serde(default, skip_serializing_if = "is_zero_i32")]
        score: i32,
    },
    Defeat { player: Player },
    Victory { player: Player },
    Gameover,
    Award {
        player: Player,
        #[serde(default, skip_serializing_if = "is_zero_u8")]
        stars: u8,
    },
}

/// Every wire name, in declaration order.
pub const WIRE_NAMES: [&str; 74] = [
    "starts", "moves", "entered", "exited", "died", "survived", "reveal", "obscure", "vision",
    "transformed", "consumed", "destroyed", "grows", "shapes", "shaped", "settles", "settled",
    "expands", "expanded", "upgrades", "upgraded", "cultivates", "cultivated", "captures",
    "captured", "produces", "produced", "aims", "attacks", "attacked", "tramples", "trampled",
    "shells", "shelled", "bombards", "bombarded", "bombs", "bombed", "frostbitten", "burned",
    "gassed", "irradiated", "snow", "frostbite", "firestorm", "bonedrought", "death", "gas",
    "radiation", "temperature", "humidity", "chaos", "year", "season", "daytime", "phase",
    "funds", "income", "expenditure", "ordered", "sleeping", "acting", "initiative",
    "finished", "discarded", "postponed", "unfinished", "corner", "border", "scored", "defeat",
    "victory", "gameover", "award",
];

impl Change {
    // -- Parsing ------------------------------------------------------------

    /// Parse one change from a structured wire value.
    pub fn parse(value: &Value) -> Result<Change, ParseError> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::Malformed {
                tag: String::new(),
                details: "missing \"type\" string".to_owned(),
            })?;
        if !WIRE_NAMES.contains(&tag) {
            return Err(ParseError::UnknownType {
                tag: tag.to_owned(),
            });
        }
        Change::deserialize(value).map_err(|e| ParseError::malformed(tag, &e))
    }

    /// Parse one change from its textual encoding.
    pub fn parse_str(text: &str) -> Result<Change, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::parse(&value)
    }

    /// Parse a JSON array of changes. The first bad element fails the whole
    /// array.
    pub fn parse_changes(text: &str) -> Result<Vec<Change>, ParseError> {
        let value: Value = serde_json::from_str(text)?;
        let items = value.as_array().ok_or_else(|| ParseError::Malformed {
            tag: String::new(),
            details: "expected a JSON array of changes".to_owned(),
        })?;
        items.iter().map(Self::parse).collect()
    }

    /// The structured wire value.
    pub fn to_value(&self) -> Value {
        // Changes contain only strings, integers, booleans and nested
        // objects with string keys, so conversion cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    // -- Accessors ----------------------------------------------------------

    /// The stable wire identifier of this change's tag.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Change::Starts { .. } => "starts",
            Change::Moves { .. } => "moves",
            Change::Entered { .. } => "entered",
            Change::Exited { .. } => "exited",
            Change::Died { .. } => "died",
            Change::Survived { .. } => "survived",
            Change::Reveal { .. } => "reveal",
            Change::Obscure { .. } => "obscure",
            Change::Vision { .. } => "vision",
            Change::Transformed { .. } => "transformed",
            Change::Consumed { .. } => "consumed",
            Change::Destroyed { .. } => "destroyed",
            Change::Grows { .. } => "grows",
            Change::Shapes { .. } => "shapes",
            Change::Shaped { .. } => "shaped",
            Change::Settles { .. } => "settles",
            Change::Settled { .. } => "settled",
            Change::Expands { .. } => "expands",
            Change::Expanded { .. } => "expanded",
            Change::Upgrades { .. } => "upgrades",
            Change::Upgraded { .. } => "upgraded",
            Change::Cultivates { .. } => "cultivates",
            Change::Cultivated { .. } => "cultivated",
            Change::Captures { .. } => "captures",
            Change::Captured { .. } => "captured",
            Change::Produces { .. } => "produces",
            Change::Produced { .. } => "produced",
            Change::Aims { .. } => "aims",
            Change::Attacks { .. } => "attacks",
            Change::Attacked(_) => "attacked",
            Change::Tramples { .. } => "tramples",
            Change::Trampled(_) => "trampled",
            Change::Shells { .. } => "shells",
            Change::Shelled(_) => "shelled",
            Change::Bombards { .. } => "bombards",
            Change::Bombarded(_) => "bombarded",
            Change::Bombs { .. } => "bombs",
            Change::Bombed(_) => "bombed",
            Change::Frostbitten(_) => "frostbitten",
            Change::Burned(_) => "burned",
            Change::Gassed(_) => "gassed",
            Change::Irradiated(_) => "irradiated",
            Change::Snow { .. } => "snow",
            Change::Frostbite { .. } => "frostbite",
            Change::Firestorm { .. } => "firestorm",
            Change::Bonedrought { .. } => "bonedrought",
            Change::Death { .. } => "death",
            Change::Gas { .. } => "gas",
            Change::Radiation { .. } => "radiation",
            Change::Temperature { .. } => "temperature",
            Change::Humidity { .. } => "humidity",
            Change::Chaos { .. } => "chaos",
            Change::Year { .. } => "year",
            Change::Season { .. } => "season",
            Change::Daytime { .. } => "daytime",
            Change::Phase { .. } => "phase",
            Change::Funds { .. } => "funds",
            Change::Income { .. } => "income",
            Change::Expenditure { .. } => "expenditure",
            Change::Ordered { .. } => "ordered",
            Change::Sleeping { .. } => "sleeping",
            Change::Acting { .. } => "acting",
            Change::Initiative { .. } => "initiative",
            Change::Finished { .. } => "finished",
            Change::Discarded { .. } => "discarded",
            Change::Postponed { .. } => "postponed",
            Change::Unfinished { .. } => "unfinished",
            Change::Corner { .. } => "corner",
            Change::Border { .. } => "border",
            Change::Scored { .. } => "scored",
            Change::Defeat { .. } => "defeat",
            Change::Victory { .. } => "victory",
            Change::Gameover => "gameover",
            Change::Award { .. } => "award",
        }
    }

    /// The slot this change concerns, or [`Descriptor::NONE`] for changes
    /// that are not about a board slot.
    pub fn subject(&self) -> Descriptor {
        match self {
            Change::Starts { subject }
            | Change::Moves { subject, .. }
            | Change::Entered { subject, .. }
            | Change::Exited { subject }
            | Change::Died { subject }
            | Change::Survived { subject }
            | Change::Reveal { subject, .. }
            | Change::Obscure { subject, .. }
            | Change::Vision { subject, .. }
            | Change::Transformed { subject, .. }
            | Change::Consumed { subject }
            | Change::Destroyed { subject, .. }
            | Change::Grows { subject, .. }
            | Change::Shapes { subject, .. }
            | Change::Shaped { subject, .. }
            | Change::Settles { subject, .. }
            | Change::Settled { subject, .. }
            | Change::Expands { subject, .. }
            | Change::Expanded { subject, .. }
            | Change::Upgrades { subject, .. }
            | Change::Upgraded { subject, .. }
            | Change::Cultivates { subject, .. }
            | Change::Cultivated { subject, .. }
            | Change::Captures { subject, .. }
            | Change::Captured { subject, .. }
            | Change::Produces { subject, .. }
            | Change::Produced { subject, .. }
            | Change::Aims { subject, .. }
            | Change::Attacks { subject, .. }
            | Change::Tramples { subject, .. }
            | Change::Shells { subject, .. }
            | Change::Bombards { subject, .. }
            | Change::Bombs { subject, .. }
            | Change::Snow { subject, .. }
            | Change::Frostbite { subject, .. }
            | Change::Firestorm { subject, .. }
            | Change::Bonedrought { subject, .. }
            | Change::Death { subject, .. }
            | Change::Gas { subject, .. }
            | Change::Radiation { subject, .. }
            | Change::Temperature { subject, .. }
            | Change::Humidity { subject, .. }
            | Change::Chaos { subject, .. }
            | Change::Discarded { subject }
            | Change::Postponed { subject }
            | Change::Unfinished { subject }
            | Change::Corner { subject }
            | Change::Border { subject } => *subject,
            Change::Attacked(hit)
            | Change::Trampled(hit)
            | Change::Shelled(hit)
            | Change::Bombarded(hit)
            | Change::Bombed(hit)
            | Change::Frostbitten(hit)
            | Change::Burned(hit)
            | Change::Gassed(hit)
            | Change::Irradiated(hit) => hit.subject,
            Change::Year { .. }
            | Change::Season { .. }
            | Change::Daytime { .. }
            | Change::Phase { .. }
            | Change::Funds { .. }
            | Change::Income { .. }
            | Change::Expenditure { .. }
            | Change::Ordered { .. }
            | Change::Sleeping { .. }
            | Change::Acting { .. }
            | Change::Initiative { .. }
            | Change::Finished { .. }
            | Change::Scored { .. }
            | Change::Defeat { .. }
            | Change::Victory { .. }
            | Change::Gameover
            | Change::Award { .. } => Descriptor::NONE,
        }
    }

    /// The secondary slot of a movement or announcement, if any.
    pub fn target(&self) -> Descriptor {
        match self {
            Change::Moves { target, .. }
            | Change::Expands { target, .. }
            | Change::Cultivates { target, .. }
            | Change::Captures { target, .. }
            | Change::Produces { target, .. }
            | Change::Aims { target, .. }
            | Change::Attacks { target, .. }
            | Change::Tramples { target, .. }
            | Change::Shells { target, .. }
            | Change::Bombards { target, .. }
            | Change::Bombs { target, .. } => *target,
            _ => Descriptor::NONE,
        }
    }

    /// The player a bookkeeping, lifecycle or terminal change is about.
    pub fn player(&self) -> Option<Player> {
        match self {
            Change::Captured { player, .. }
            | Change::Funds { player, .. }
            | Change::Income { player, .. }
            | Change::Expenditure { player, .. }
            | Change::Ordered { player }
            | Change::Sleeping { player }
            | Change::Acting { player }
            | Change::Initiative { player }
            | Change::Finished { player }
            | Change::Scored { player, .. }
            | Change::Defeat { player }
            | Change::Victory { player }
            | Change::Award { player, .. } => Some(*player),
            _ => None,
        }
    }

    /// True for intent-only tags whose resolved counterpart carries the
    /// mutation. Announcements never change a board.
    pub fn is_announcement(&self) -> bool {
        matches!(
            self,
            Change::Starts { .. }
                | Change::Survived { .. }
                | Change::Shapes { .. }
                | Change::Settles { .. }
                | Change::Expands { .. }
                | Change::Upgrades { .. }
                | Change::Cultivates { .. }
                | Change::Captures { .. }
                | Change::Produces { .. }
                | Change::Aims { .. }
                | Change::Attacks { .. }
                | Change::Tramples { .. }
                | Change::Shells { .. }
                | Change::Bombards { .. }
                | Change::Bombs { .. }
        )
    }

    /// The resolved hit carried by combat and hazard-damage tags.
    pub fn hit(&self) -> Option<&Hit> {
        match self {
            Change::Attacked(hit)
            | Change::Trampled(hit)
            | Change::Shelled(hit)
            | Change::Bombarded(hit)
            | Change::Bombed(hit)
            | Change::Frostbitten(hit)
            | Change::Burned(hit)
            | Change::Gassed(hit)
            | Change::Irradiated(hit) => Some(hit),
            _ => None,
        }
    }

    /// Tile type names this change mentions.
    pub fn tile_types(&self) -> Vec<&TileType> {
        match self {
            Change::Reveal { cell, .. } => vec![&cell.tile.kind],
            Change::Transformed { tile, .. }
            | Change::Destroyed { tile, .. }
            | Change::Shaped { tile, .. }
            | Change::Settled { tile, .. }
            | Change::Expanded { tile, .. }
            | Change::Upgraded { tile, .. }
            | Change::Cultivated { tile, .. } => vec![&tile.kind],
            Change::Shapes { tiletype, .. }
            | Change::Settles { tiletype, .. }
            | Change::Expands { tiletype, .. }
            | Change::Upgrades { tiletype, .. }
            | Change::Cultivates { tiletype, .. } => vec![tiletype],
            _ => Vec::new(),
        }
    }

    /// Unit type names this change mentions.
    pub fn unit_types(&self) -> Vec<&UnitType> {
        match self {
            Change::Reveal { cell, .. } => {
                vec![&cell.ground.kind, &cell.air.kind, &cell.bypass.kind]
            }
            Change::Entered { unit, .. } | Change::Produced { unit, .. } => vec![&unit.kind],
            Change::Produces { unittype, .. } => vec![unittype],
            _ => Vec::new(),
        }
    }

    // -- Transformations ----------------------------------------------------

    /// A copy with every player identity passed through `f`: player fields,
    /// token owners and vision payloads.
    #[must_use]
    pub fn players_mapped(&self, f: impl Fn(Player) -> Player) -> Change {
        let owner = |o: &Option<Player>| o.map(&f);
        let tile = |t: &TileToken| TileToken {
            owner: owner(&t.owner),
            ..t.clone()
        };
        let unit = |u: &UnitToken| UnitToken {
            owner: owner(&u.owner),
            ..u.clone()
        };

        match self {
            Change::Entered { subject, unit: u } => Change::Entered {
                subject: *subject,
                unit: unit(u),
            },
            Change::Reveal {
                subject,
                cell,
                vision,
            } => Change::Reveal {
                subject: *subject,
                cell: Cell {
                    tile: tile(&cell.tile),
                    ground: unit(&cell.ground),
                    air: unit(&cell.air),
                    bypass: unit(&cell.bypass),
                    ..cell.clone()
                },
                vision: vision.map(&f),
            },
            Change::Obscure { subject, vision } => Change::Obscure {
                subject: *subject,
                vision: vision.map(&f),
            },
            Change::Vision { subject, vision } => Change::Vision {
                subject: *subject,
                vision: vision.map(&f),
            },
            Change::Transformed { subject, tile: t } => Change::Transformed {
                subject: *subject,
                tile: tile(t),
            },
            Change::Destroyed { subject, tile: t } => Change::Destroyed {
                subject: *subject,
                tile: tile(t),
            },
            Change::Shaped { subject, tile: t } => Change::Shaped {
                subject: *subject,
                tile: tile(t),
            },
            Change::Settled { subject, tile: t } => Change::Settled {
                subject: *subject,
                tile: tile(t),
            },
            Change::Expanded { subject, tile: t } => Change::Expanded {
                subject: *subject,
                tile: tile(t),
            },
            Change::Upgraded { subject, tile: t } => Change::Upgraded {
                subject: *subject,
                tile: tile(t),
            },
            Change::Cultivated { subject, tile: t } => Change::Cultivated {
                subject: *subject,
                tile: tile(t),
            },
            Change::Produced { subject, unit: u } => Change::Produced {
                subject: *subject,
                unit: unit(u),
            },
            Change::Captured { subject, player } => Change::Captured {
                subject: *subject,
                player: f(*player),
            },
            Change::Funds { player, money } => Change::Funds {
                player: f(*player),
                money: *money,
            },
            Change::Income { player, money } => Change::Income {
                player: f(*player),
                money: *money,
            },
            Change::Expenditure { player, money } => Change::Expenditure {
                player: f(*player),
                money: *money,
            },
            Change::Ordered { player } => Change::Ordered { player: f(*player) },
            Change::Sleeping { player } => Change::Sleeping { player: f(*player) },
            Change::Acting { player } => Change::Acting { player: f(*player) },
            Change::Initiative { player } => Change::Initiative { player: f(*player) },
            Change::Finished { player } => Change::Finished { player: f(*player) },
            Change::Scored { player, score } => Change::Scored {
                player: f(*player),
                score: *score,
            },
            Change::Defeat { player } => Change::Defeat { player: f(*player) },
            Change::Victory { player } => Change::Victory { player: f(*player) },
            Change::Award { player, stars } => Change::Award {
                player: f(*player),
                stars: *stars,
            },
            other => other.clone(),
        }
    }

    /// The reduced form shown to an observer who could not see this change,
    /// or `None` if such an observer must not learn of it at all.
    ///
    /// Fog changes, geometry and public bookkeeping pass through. A reveal
    /// becomes a bare vision update. The loud ranged strikes (`shells`,
    /// `bombards`, `bombs`) are kept with both descriptors blanked so the
    /// observer knows something happened without learning where.
    pub fn redacted(&self) -> Option<Change> {
        match self {
            Change::Reveal {
                subject, vision, ..
            } => Some(Change::Vision {
                subject: *subject,
                vision: *vision,
            }),
            Change::Obscure { .. }
            | Change::Vision { .. }
            | Change::Corner { .. }
            | Change::Border { .. }
            | Change::Year { .. }
            | Change::Season { .. }
            | Change::Daytime { .. }
            | Change::Phase { .. }
            | Change::Ordered { .. }
            | Change::Sleeping { .. }
            | Change::Acting { .. }
            | Change::Initiative { .. }
            | Change::Finished { .. }
            | Change::Scored { .. }
            | Change::Defeat { .. }
            | Change::Victory { .. }
            | Change::Gameover
            | Change::Award { .. } => Some(self.clone()),
            Change::Shells { .. } => Some(Change::Shells {
                subject: Descriptor::NONE,
                target: Descriptor::NONE,
            }),
            Change::Bombards { .. } => Some(Change::Bombards {
                subject: Descriptor::NONE,
                target: Descriptor::NONE,
            }),
            Change::Bombs { .. } => Some(Change::Bombs {
                subject: Descriptor::NONE,
                target: Descriptor::NONE,
            }),
            _ => None,
        }
    }

    /// The form shown to an observer who sees the target of an order but
    /// not the cell it was given from: the subject is blanked. Changes
    /// without a target reduce to [`redacted`](Self::redacted).
    pub fn glimpsed(&self) -> Option<Change> {
        let mut change = self.clone();
        match &mut change {
            Change::Expands { subject, .. }
            | Change::Cultivates { subject, .. }
            | Change::Captures { subject, .. }
            | Change::Produces { subject, .. }
            | Change::Aims { subject, .. }
            | Change::Attacks { subject, .. }
            | Change::Tramples { subject, .. }
            | Change::Shells { subject, .. }
            | Change::Bombards { subject, .. }
            | Change::Bombs { subject, .. } => {
                *subject = Descriptor::NONE;
                Some(change)
            }
            _ => self.redacted(),
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Change {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Change::parse_str(s)
    }
}
