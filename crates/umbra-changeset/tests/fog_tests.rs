//! Fog-of-war scenarios: authoritative log, projected streams and replicas.
//!
//! Each test builds a small authoritative change log by hand, projects it
//! for several observers and feeds the projections to independent replica
//! boards, the way live consumers do.

use umbra_board::prelude::*;
use umbra_changeset::ChangeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(row: i16, col: i16) -> Position {
    Position::new(row, col)
}

fn seen_by(players: &[Player]) -> Vision {
    players.iter().copied().chain([Player::Observer]).collect()
}

/// A 4x4 board where Red sees the left half and Blue the right half.
fn setup_log(bible: &Bible) -> ChangeSet {
    let mut set = ChangeSet::new();
    set.push(
        Change::Corner {
            subject: Descriptor::cell(at(3, 3)),
        },
        Vision::everyone(),
    );
    for row in 0..4 {
        for col in 0..4 {
            let owner = if col < 2 { Player::Red } else { Player::Blue };
            let vision = seen_by(&[owner]);
            set.push(
                Change::Reveal {
                    subject: Descriptor::cell(at(row, col)),
                    cell: Cell {
                        tile: TileToken::new(bible.tiletype("grass").unwrap(), None, 0, 0),
                        ..Cell::default()
                    },
                    vision,
                },
                vision,
            );
        }
    }
    set
}

fn replica<'b>(bible: &'b Bible, perspective: Player, stream: &[Change]) -> Board<'b> {
    let mut board = Board::new(bible, perspective);
    for change in stream {
        board.enact(change);
    }
    board
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn hidden_entry_is_omitted_for_red_and_kept_for_observer() {
    let bible = Bible::standard();
    let mut set = setup_log(&bible);
    let tank = UnitToken::new(bible.unittype("tank").unwrap(), Some(Player::Blue), 2);
    let entered = Change::Entered {
        subject: Descriptor::ground(at(2, 3)),
        unit: tank,
    };
    set.push(entered.clone(), seen_by(&[Player::Blue]));

    let red = set.get(Player::Red);
    assert!(red.iter().all(|c| !matches!(c, Change::Entered { .. })));
    // The only trace of (2, 3) Red receives is its fog state.
    assert!(red
        .iter()
        .filter(|c| c.subject().position == at(2, 3))
        .all(|c| matches!(c, Change::Vision { .. })));
    assert!(!red.contains(&entered));
    assert!(set.get(Player::Observer).contains(&entered));
}

#[test]
fn replicas_converge_to_their_partial_views() {
    let bible = Bible::standard();
    let mut set = setup_log(&bible);
    let tank = UnitToken::new(bible.unittype("tank").unwrap(), Some(Player::Blue), 2);
    set.push(
        Change::Entered {
            subject: Descriptor::ground(at(2, 3)),
            unit: tank,
        },
        seen_by(&[Player::Blue]),
    );

    let authority = replica(&bible, Player::Observer, &set.get(Player::Observer));
    let red = replica(&bible, Player::Myself, &set.get(Player::Red));
    let blue = replica(&bible, Player::Myself, &set.get(Player::Blue));
    let blind = replica(&bible, Player::Blind, &set.get(Player::Blind));

    let hidden = Descriptor::ground(at(2, 3));
    assert_eq!(authority.unit(hidden).owner, Some(Player::Blue));
    assert!(red.unit(hidden).is_none());
    assert_eq!(blue.unit(hidden).owner, Some(Player::Myself));
    assert!(blind.unit(hidden).is_none());

    // Every replica knows the geometry and the fog layout.
    for board in [&red, &blue, &blind] {
        assert_eq!((board.rows(), board.cols()), (4, 4));
    }
    assert!(red.perceives(at(0, 0)));
    assert!(!red.perceives(at(2, 3)));
    assert!(blue.perceives(at(2, 3)));
    assert!(!blind.perceives(at(0, 0)));

    // Red learned nothing about the cells it cannot see.
    assert!(red.tile(at(2, 3)).is_none());
    assert_eq!(red.tile(at(2, 0)).kind.as_str(), "grass");
}

#[test]
fn losing_sight_forgets_units_on_the_replica() {
    let bible = Bible::standard();
    let mut set = setup_log(&bible);
    let rifleman = UnitToken::new(bible.unittype("rifleman").unwrap(), Some(Player::Blue), 1);
    let cell = at(1, 1);
    set.push(
        Change::Entered {
            subject: Descriptor::ground(cell),
            unit: rifleman,
        },
        seen_by(&[Player::Red]),
    );
    // Red's sight on (1, 1) goes away.
    set.push(
        Change::Obscure {
            subject: Descriptor::cell(cell),
            vision: seen_by(&[]),
        },
        Vision::of(Player::Red),
    );

    let red = replica(&bible, Player::Myself, &set.get(Player::Red));
    assert!(!red.perceives(cell));
    assert!(red.unit(Descriptor::ground(cell)).is_none());
    assert_eq!(red.tile(cell).kind.as_str(), "grass");

    let observer = replica(&bible, Player::Observer, &set.get(Player::Observer));
    assert_eq!(observer.unit(Descriptor::ground(cell)).stacks, 1);
}

#[test]
fn one_log_fans_out_to_many_consumers() {
    let bible = Bible::standard();
    let set = setup_log(&bible);
    let observers = [Player::Red, Player::Blue, Player::Blind, Player::Observer];
    let first: Vec<Vec<Change>> = observers.iter().map(|o| set.get(*o)).collect();
    let second: Vec<Vec<Change>> = observers.iter().map(|o| set.get(*o)).collect();
    assert_eq!(first, second);
    // Everyone receives one entry per logged fog change.
    for projection in &first {
        assert_eq!(projection.len(), set.len());
    }
}
