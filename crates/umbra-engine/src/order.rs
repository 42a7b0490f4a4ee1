//! Player orders and their intake validation.
//!
//! Orders arrive as a JSON array, each object tagged by `"type"`:
//!
//! ```text
//! [{"type":"move","subject":{"type":"ground","row":1,"col":1},"moves":["e","e"]},
//!  {"type":"produce","subject":{"type":"tile","row":0,"col":0},
//!   "target":{"type":"cell","row":0,"col":1},"unittype":"rifleman"}]
//! ```
//!
//! [`Order::validate`] checks an order against the ruleset and the current
//! authoritative board at intake time. A rejected order never reaches
//! resolution; an accepted one can still be discarded during resolution when
//! the board has changed in the meantime (the target is occupied, the unit
//! died, the player cannot pay).

use serde::{Deserialize, Serialize};
use umbra_board::board::Board;
use umbra_board::descriptor::{Descriptor, DescriptorKind};
use umbra_board::player::Player;
use umbra_board::position::{Move, Position};
use umbra_board::token::{TileType, UnitType};

// ---------------------------------------------------------------------------
// OrderError
// ---------------------------------------------------------------------------

/// Why an order was rejected at intake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("position {position} is outside the board")]
    OutOfBounds { position: Position },

    #[error("{subject:?} must name a {expected}")]
    WrongKind {
        subject: Descriptor,
        expected: &'static str,
    },

    #[error("nothing at {subject:?}")]
    NoSubject { subject: Descriptor },

    #[error("{subject:?} does not belong to {player}")]
    NotOwned { subject: Descriptor, player: Player },

    #[error("{subject:?} cannot {ability}")]
    MissingAbility {
        subject: Descriptor,
        ability: &'static str,
    },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("{subject:?} cannot build '{name}'")]
    NotBuildable { subject: Descriptor, name: String },

    #[error("{target:?} is out of range of {subject:?}")]
    OutOfRange {
        subject: Descriptor,
        target: Descriptor,
    },

    #[error("move order for {subject:?} has no steps")]
    EmptyPath { subject: Descriptor },

    #[error("{subject:?} already has an order this round")]
    DuplicateSubject { subject: Descriptor },
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// One instruction for one unit or tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Order {
    /// Walk the unit along `moves`, one step per pass, up to its speed.
    Move { subject: Descriptor, moves: Vec<Move> },
    /// Attack a unit or tile in range.
    Focus { subject: Descriptor, target: Descriptor },
    /// Ranged strike on a cell slot.
    Shell { subject: Descriptor, target: Descriptor },
    /// Ranged strike from the air.
    Bombard { subject: Descriptor, target: Descriptor },
    /// Strike whatever lies below an air unit.
    Bomb { subject: Descriptor },
    /// Take over the tile under the unit.
    Capture { subject: Descriptor },
    /// Turn the tile under the unit into `tiletype`.
    Shape { subject: Descriptor, tiletype: TileType },
    /// Like shape, but the unit is used up.
    Settle { subject: Descriptor, tiletype: TileType },
    /// Build `tiletype` on an adjacent cell.
    Expand {
        subject: Descriptor,
        target: Descriptor,
        tiletype: TileType,
    },
    /// Replace the tile by a better one.
    Upgrade { subject: Descriptor, tiletype: TileType },
    /// Build `tiletype` on an adjacent cell.
    Cultivate {
        subject: Descriptor,
        target: Descriptor,
        tiletype: TileType,
    },
    /// Create a unit on the tile's own or an adjacent cell.
    Produce {
        subject: Descriptor,
        target: Descriptor,
        unittype: UnitType,
    },
    /// Do nothing this round.
    Halt { subject: Descriptor },
}

impl Order {
    /// Parse a JSON array of orders.
    pub fn parse_orders(json: &str) -> Result<Vec<Order>, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The unit or tile the order is given to.
    pub fn subject(&self) -> Descriptor {
        match self {
            Order::Move { subject, .. }
            | Order::Focus { subject, .. }
            | Order::Shell { subject, .. }
            | Order::Bombard { subject, .. }
            | Order::Bomb { subject }
            | Order::Capture { subject }
            | Order::Shape { subject, .. }
            | Order::Settle { subject, .. }
            | Order::Expand { subject, .. }
            | Order::Upgrade { subject, .. }
            | Order::Cultivate { subject, .. }
            | Order::Produce { subject, .. }
            | Order::Halt { subject } => *subject,
        }
    }

    /// The slot the order acts upon, when it names one.
    pub fn target(&self) -> Option<Descriptor> {
        match self {
            Order::Focus { target, .. }
            | Order::Shell { target, .. }
            | Order::Bombard { target, .. }
            | Order::Expand { target, .. }
            | Order::Cultivate { target, .. }
            | Order::Produce { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Check the order for `player` against the ruleset and the current
    /// authoritative `board`.
    pub fn validate(&self, board: &Board<'_>, player: Player) -> Result<(), OrderError> {
        let bible = board.bible();
        let subject = self.subject();
        on_board(board, subject.position)?;
        if let Some(target) = self.target() {
            on_board(board, target.position)?;
        }

        if matches!(
            self,
            Order::Expand { .. } | Order::Upgrade { .. } | Order::Cultivate { .. } | Order::Produce { .. }
        ) {
            if subject.kind != DescriptorKind::Tile {
                return Err(OrderError::WrongKind {
                    subject,
                    expected: "tile",
                });
            }
            let tile = board.tile(subject.position);
            if tile.is_none() {
                return Err(OrderError::NoSubject { subject });
            }
            if tile.owner != Some(player) {
                return Err(OrderError::NotOwned { subject, player });
            }
            let def = bible.tile(&tile.kind).ok_or_else(|| OrderError::UnknownType {
                name: tile.kind.to_string(),
            })?;
            return match self {
                Order::Expand {
                    target, tiletype, ..
                } => {
                    known_tile(board, tiletype)?;
                    within(subject, *target, 1, 1)?;
                    buildable(subject, def.expands.contains(tiletype), tiletype.as_str())
                }
                Order::Upgrade { tiletype, .. } => {
                    known_tile(board, tiletype)?;
                    buildable(subject, def.upgrades.contains(tiletype), tiletype.as_str())
                }
                Order::Cultivate {
                    target, tiletype, ..
                } => {
                    known_tile(board, tiletype)?;
                    within(subject, *target, 1, 1)?;
                    buildable(subject, def.cultivates.contains(tiletype), tiletype.as_str())
                }
                Order::Produce {
                    target, unittype, ..
                } => {
                    if bible.unit(unittype).is_none() {
                        return Err(OrderError::UnknownType {
                            name: unittype.to_string(),
                        });
                    }
                    within(subject, *target, 0, 1)?;
                    buildable(subject, def.produces.contains(unittype), unittype.as_str())
                }
                _ => Ok(()),
            };
        }

        if !subject.is_unit() {
            return Err(OrderError::WrongKind {
                subject,
                expected: "unit",
            });
        }
        let unit = board.unit(subject);
        if unit.is_none() {
            return Err(OrderError::NoSubject { subject });
        }
        if unit.owner != Some(player) {
            return Err(OrderError::NotOwned { subject, player });
        }
        let def = bible.unit(&unit.kind).ok_or_else(|| OrderError::UnknownType {
            name: unit.kind.to_string(),
        })?;
        let abilities = def.abilities;
        let requires = |has: bool, ability: &'static str| {
            if has {
                Ok(())
            } else {
                Err(OrderError::MissingAbility { subject, ability })
            }
        };

        match self {
            Order::Move { moves, .. } => {
                if moves.is_empty() {
                    return Err(OrderError::EmptyPath { subject });
                }
                let mut pos = subject.position;
                for mv in moves {
                    pos = pos.step(*mv);
                    on_board(board, pos)?;
                }
                Ok(())
            }
            Order::Focus { target, .. } => {
                requires(abilities.focus, "focus")?;
                within(subject, *target, 1, def.range)
            }
            Order::Shell { target, .. } => {
                requires(abilities.shell, "shell")?;
                within(subject, *target, 1, def.range)
            }
            Order::Bombard { target, .. } => {
                requires(abilities.bombard, "bombard")?;
                within(subject, *target, 1, def.range)
            }
            Order::Bomb { .. } => {
                requires(abilities.bomb, "bomb")?;
                if subject.kind != DescriptorKind::Air {
                    return Err(OrderError::WrongKind {
                        subject,
                        expected: "air unit",
                    });
                }
                Ok(())
            }
            Order::Capture { .. } => {
                requires(abilities.capture, "capture")?;
                if board.tile(subject.position).is_none() {
                    return Err(OrderError::NoSubject {
                        subject: Descriptor::tile(subject.position),
                    });
                }
                Ok(())
            }
            Order::Shape { tiletype, .. } => {
                known_tile(board, tiletype)?;
                buildable(subject, def.shapes.contains(tiletype), tiletype.as_str())
            }
            Order::Settle { tiletype, .. } => {
                known_tile(board, tiletype)?;
                buildable(subject, def.settles.contains(tiletype), tiletype.as_str())
            }
            Order::Halt { .. } => Ok(()),
            Order::Expand { .. }
            | Order::Upgrade { .. }
            | Order::Cultivate { .. }
            | Order::Produce { .. } => Ok(()),
        }
    }
}

fn on_board(board: &Board<'_>, position: Position) -> Result<(), OrderError> {
    if board.contains(position) {
        Ok(())
    } else {
        Err(OrderError::OutOfBounds { position })
    }
}

fn within(subject: Descriptor, target: Descriptor, min: u16, max: u16) -> Result<(), OrderError> {
    let distance = subject.position.distance(target.position);
    if (min..=max).contains(&distance) {
        Ok(())
    } else {
        Err(OrderError::OutOfRange { subject, target })
    }
}

fn known_tile(board: &Board<'_>, tiletype: &TileType) -> Result<(), OrderError> {
    match board.bible().tile(tiletype) {
        Some(_) => Ok(()),
        None => Err(OrderError::UnknownType {
            name: tiletype.to_string(),
        }),
    }
}

fn buildable(subject: Descriptor, allowed: bool, name: &str) -> Result<(), OrderError> {
    if allowed {
        Ok(())
    } else {
        Err(OrderError::NotBuildable {
            subject,
            name: name.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_board::bible::Bible;
    use umbra_board::cell::Cell;
    use umbra_board::token::{TileToken, UnitToken};

    fn at(row: i16, col: i16) -> Position {
        Position::new(row, col)
    }

    /// A 4x4 board with a Red town at (0, 0), a Red tank at (1, 1), a Red
    /// zeppelin at (2, 2) and a Blue rifleman at (1, 2).
    fn board(bible: &Bible) -> Board<'_> {
        let mut board = Board::new(bible, Player::Observer);
        board.clear(4, 4);
        let grass = TileToken::new(TileType::new("grass"), None, 0, 0);
        for pos in board.positions() {
            board.place(
                pos,
                Cell {
                    tile: grass.clone(),
                    ..Cell::default()
                },
            );
        }
        board.place(
            at(0, 0),
            Cell {
                tile: TileToken::new(TileType::new("town"), Some(Player::Red), 2, 2),
                ..Cell::default()
            },
        );
        board.place(
            at(1, 1),
            Cell {
                tile: grass.clone(),
                ground: UnitToken::new(UnitType::new("tank"), Some(Player::Red), 2),
                ..Cell::default()
            },
        );
        board.place(
            at(2, 2),
            Cell {
                tile: grass.clone(),
                air: UnitToken::new(UnitType::new("zeppelin"), Some(Player::Red), 1),
                ..Cell::default()
            },
        );
        board.place(
            at(1, 2),
            Cell {
                tile: grass,
                ground: UnitToken::new(UnitType::new("rifleman"), Some(Player::Blue), 1),
                ..Cell::default()
            },
        );
        board
    }

    // -- 1. Wire format ------------------------------------------------------

    #[test]
    fn parses_tagged_orders() {
        let orders = Order::parse_orders(
            r#"[{"type":"move","subject":{"type":"ground","row":1,"col":1},"moves":["e","s"]},
                {"type":"halt","subject":{"type":"ground","row":1,"col":1}}]"#,
        )
        .unwrap();
        assert_eq!(
            orders[0],
            Order::Move {
                subject: Descriptor::ground(at(1, 1)),
                moves: vec![Move::East, Move::South],
            }
        );
        assert_eq!(orders[1].subject(), Descriptor::ground(at(1, 1)));
    }

    #[test]
    fn unknown_order_type_is_a_parse_error() {
        assert!(Order::parse_orders(r#"[{"type":"teleport"}]"#).is_err());
    }

    // -- 2. Unit orders ------------------------------------------------------

    #[test]
    fn valid_unit_orders_pass() {
        let bible = Bible::standard();
        let board = board(&bible);
        let tank = Descriptor::ground(at(1, 1));
        let orders = [
            Order::Move {
                subject: tank,
                moves: vec![Move::South],
            },
            Order::Focus {
                subject: tank,
                target: Descriptor::ground(at(1, 2)),
            },
            Order::Bomb {
                subject: Descriptor::air(at(2, 2)),
            },
            Order::Halt { subject: tank },
        ];
        for order in orders {
            assert_eq!(order.validate(&board, Player::Red), Ok(()), "{order:?}");
        }
    }

    #[test]
    fn foreign_and_missing_units_are_rejected() {
        let bible = Bible::standard();
        let board = board(&bible);
        let halt = |subject| Order::Halt { subject };
        assert!(matches!(
            halt(Descriptor::ground(at(1, 2))).validate(&board, Player::Red),
            Err(OrderError::NotOwned { .. })
        ));
        assert!(matches!(
            halt(Descriptor::ground(at(3, 3))).validate(&board, Player::Red),
            Err(OrderError::NoSubject { .. })
        ));
        assert!(matches!(
            halt(Descriptor::ground(at(9, 9))).validate(&board, Player::Red),
            Err(OrderError::OutOfBounds { .. })
        ));
        assert!(matches!(
            halt(Descriptor::tile(at(1, 1))).validate(&board, Player::Red),
            Err(OrderError::WrongKind { .. })
        ));
    }

    #[test]
    fn abilities_and_ranges_are_enforced() {
        let bible = Bible::standard();
        let board = board(&bible);
        let tank = Descriptor::ground(at(1, 1));
        let shell = Order::Shell {
            subject: tank,
            target: Descriptor::ground(at(1, 2)),
        };
        assert_eq!(
            shell.validate(&board, Player::Red),
            Err(OrderError::MissingAbility {
                subject: tank,
                ability: "shell"
            })
        );
        let far = Order::Focus {
            subject: tank,
            target: Descriptor::ground(at(3, 3)),
        };
        assert!(matches!(
            far.validate(&board, Player::Red),
            Err(OrderError::OutOfRange { .. })
        ));
    }

    #[test]
    fn paths_must_stay_on_the_board() {
        let bible = Bible::standard();
        let board = board(&bible);
        let tank = Descriptor::ground(at(1, 1));
        let empty = Order::Move {
            subject: tank,
            moves: Vec::new(),
        };
        assert_eq!(
            empty.validate(&board, Player::Red),
            Err(OrderError::EmptyPath { subject: tank })
        );
        let off = Order::Move {
            subject: tank,
            moves: vec![Move::North, Move::North],
        };
        assert_eq!(
            off.validate(&board, Player::Red),
            Err(OrderError::OutOfBounds {
                position: at(-1, 1)
            })
        );
    }

    // -- 3. Tile orders ------------------------------------------------------

    #[test]
    fn tile_orders_follow_the_ruleset() {
        let bible = Bible::standard();
        let board = board(&bible);
        let town = Descriptor::tile(at(0, 0));
        let produce = Order::Produce {
            subject: town,
            target: Descriptor::cell(at(0, 1)),
            unittype: UnitType::new("rifleman"),
        };
        assert_eq!(produce.validate(&board, Player::Red), Ok(()));

        let tank = Order::Produce {
            subject: town,
            target: Descriptor::cell(at(0, 1)),
            unittype: UnitType::new("tank"),
        };
        assert!(matches!(
            tank.validate(&board, Player::Red),
            Err(OrderError::NotBuildable { .. })
        ));

        let upgrade = Order::Upgrade {
            subject: town,
            tiletype: TileType::new("city"),
        };
        assert_eq!(upgrade.validate(&board, Player::Red), Ok(()));
        assert!(matches!(
            upgrade.validate(&board, Player::Blue),
            Err(OrderError::NotOwned { .. })
        ));

        let bogus = Order::Upgrade {
            subject: town,
            tiletype: TileType::new("castle"),
        };
        assert!(matches!(
            bogus.validate(&board, Player::Red),
            Err(OrderError::UnknownType { .. })
        ));
    }
}
