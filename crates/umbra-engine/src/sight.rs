//! Who can see which cell.
//!
//! Sight is derived entirely from the authoritative board: every owned tile
//! and every owned unit lets its owner see the cells within its ruleset
//! vision radius (Manhattan distance). [`Player::Observer`] sees every cell
//! and [`Player::Blind`] none.

use umbra_board::board::Board;
use umbra_board::player::Player;
use umbra_board::position::Position;
use umbra_board::vision::Vision;

/// The vision every on-board cell should have, in the board's scan order.
pub fn compute(board: &Board<'_>) -> Vec<(Position, Vision)> {
    let bible = board.bible();
    let positions = board.positions();
    let mut sight: Vec<Vision> = vec![Vision::of(Player::Observer); positions.len()];
    let slot = |pos: Position| board.index_of(pos);

    let mut grant = |owner: Option<Player>, from: Position, radius: u16| {
        let Some(color) = owner.filter(|p| p.is_color()) else {
            return;
        };
        for pos in from.area(radius) {
            if let Some(index) = slot(pos) {
                sight[index].add(color);
            }
        }
    };

    for &pos in &positions {
        let cell = board.cell(pos);
        if let Some(def) = bible.tile(&cell.tile.kind) {
            grant(cell.tile.owner, pos, def.vision);
        }
        for (_, unit) in cell.units() {
            let radius = bible.unit(&unit.kind).map_or(0, |def| def.vision);
            grant(unit.owner, pos, radius);
        }
    }

    positions
        .into_iter()
        .filter_map(|pos| slot(pos).map(|index| (pos, sight[index])))
        .collect()
}
