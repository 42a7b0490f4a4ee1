//! The grid of cells and its single mutator.
//!
//! A [`Board`] is used twice over: the automaton owns the authoritative
//! board, and every consumer (player commander, AI agent, spectator,
//! recording replayer) owns a separate replica that it keeps in sync only by
//! enacting the changes it is allowed to see. Replicas are never copied from
//! the authoritative board; a replica genuinely cannot contain information it
//! was never sent.
//!
//! Storage is a dense row-major vector of `rows * cols + 1` cells with a
//! parallel vector of [`Vision`]s. The last slot is an off-board sentinel
//! that every invalid position resolves to; it is never written.
//!
//! # Example
//!
//! ```
//! use umbra_board::prelude::*;
//!
//! let bible = Bible::standard();
//! let mut board = Board::new(&bible, Player::Observer);
//! board.enact(&Change::Corner { subject: Descriptor::cell(Position::new(3, 4)) });
//! assert_eq!((board.rows(), board.cols()), (4, 5));
//!
//! let unit = UnitToken::new(bible.unittype("rifleman").unwrap(), Some(Player::Red), 2);
//! let here = Descriptor::ground(Position::new(1, 1));
//! board.enact(&Change::Entered { subject: here, unit });
//! board.enact(&Change::Attacked(Hit::new(here, true, false)));
//! assert_eq!(board.unit(here).stacks, 1);
//! ```

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, warn};

use crate::bible::Bible;
use crate::cell::Cell;
use crate::change::Change;
use crate::descriptor::{Descriptor, DescriptorKind};
use crate::player::Player;
use crate::position::{Position, MAX_COLS, MAX_ROWS};
use crate::token::{TileToken, UnitToken};
use crate::vision::Vision;

/// A board of cells bound to a ruleset that outlives it.
#[derive(Debug, Clone)]
pub struct Board<'b> {
    bible: &'b Bible,
    perspective: Player,
    rows: i16,
    cols: i16,
    cells: Vec<Cell>,
    visions: Vec<Vision>,
    next_id: u32,
}

impl<'b> Board<'b> {
    /// An empty 0x0 board seen from `perspective`.
    ///
    /// Use [`Player::Observer`] for the authoritative board and spectator
    /// replicas, [`Player::Myself`] for a player's own replica and
    /// [`Player::Blind`] for a replica that sees nothing.
    pub fn new(bible: &'b Bible, perspective: Player) -> Self {
        Self {
            bible,
            perspective,
            rows: 0,
            cols: 0,
            cells: vec![Cell::default()],
            visions: vec![Vision::none()],
            next_id: 1,
        }
    }

    pub fn bible(&self) -> &'b Bible {
        self.bible
    }

    pub fn perspective(&self) -> Player {
        self.perspective
    }

    pub fn rows(&self) -> i16 {
        self.rows
    }

    pub fn cols(&self) -> i16 {
        self.cols
    }

    // -----------------------------------------------------------------------
    // Geometry
    // -----------------------------------------------------------------------

    /// Reset to an empty board of the given size.
    pub fn clear(&mut self, cols: i16, rows: i16) {
        let (cols, rows) = Self::clamp_size(cols, rows);
        self.cols = cols;
        self.rows = rows;
        let n = rows as usize * cols as usize;
        self.cells = vec![Cell::default(); n + 1];
        self.visions = vec![Vision::none(); n + 1];
        self.next_id = 1;
    }

    /// Change the dimensions, keeping the contents of every position that
    /// stays on the board.
    pub fn resize(&mut self, cols: i16, rows: i16) {
        let (cols, rows) = Self::clamp_size(cols, rows);
        if cols == self.cols && rows == self.rows {
            return;
        }
        let n = rows as usize * cols as usize;
        let mut cells = vec![Cell::default(); n + 1];
        let mut visions = vec![Vision::none(); n + 1];
        for row in 0..rows.min(self.rows) {
            for col in 0..cols.min(self.cols) {
                let old = row as usize * self.cols as usize + col as usize;
                let new = row as usize * cols as usize + col as usize;
                cells[new] = std::mem::take(&mut self.cells[old]);
                visions[new] = self.visions[old];
            }
        }
        debug!(cols, rows, "board resized");
        self.cols = cols;
        self.rows = rows;
        self.cells = cells;
        self.visions = visions;
    }

    fn clamp_size(cols: i16, rows: i16) -> (i16, i16) {
        debug_assert!(
            (0..=MAX_COLS).contains(&cols) && (0..=MAX_ROWS).contains(&rows),
            "board size {cols}x{rows} exceeds {MAX_COLS}x{MAX_ROWS}"
        );
        if cols > MAX_COLS || rows > MAX_ROWS {
            error!(cols, rows, "board size exceeds maximum, clamping");
        }
        (cols.clamp(0, MAX_COLS), rows.clamp(0, MAX_ROWS))
    }

    /// Dense index of `pos`, or `None` when it lies off the board.
    pub fn index_of(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 || pos.row >= self.rows || pos.col >= self.cols {
            return None;
        }
        Some(pos.row as usize * self.cols as usize + pos.col as usize)
    }

    fn slot(&self, pos: Position) -> usize {
        self.index_of(pos).unwrap_or(self.cells.len() - 1)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.index_of(pos).is_some()
    }

    /// Every on-board position in the ruleset's scan order.
    pub fn positions(&self) -> Vec<Position> {
        let mut all: Vec<Position> = (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| Position::new(row, col)))
            .collect();
        let order = self.bible.scan_order;
        all.sort_by_key(|p| order.key(*p));
        all
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The cell at `pos`, or the empty sentinel when off the board.
    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[self.slot(pos)]
    }

    pub fn tile(&self, pos: Position) -> &TileToken {
        &self.cell(pos).tile
    }

    /// The unit in the layer named by `desc`. Non-unit descriptors and
    /// off-board positions yield an empty token.
    pub fn unit(&self, desc: Descriptor) -> &UnitToken {
        let sentinel = &self.cells[self.cells.len() - 1].ground;
        self.cell(desc.position).unit(desc.kind).unwrap_or(sentinel)
    }

    pub fn vision(&self, pos: Position) -> Vision {
        self.visions[self.slot(pos)]
    }

    /// Whether this board's perspective currently sees `pos`.
    pub fn perceives(&self, pos: Position) -> bool {
        self.contains(pos) && self.vision(pos).contains(self.perspective)
    }

    /// Every occupied unit slot, in scan order.
    pub fn units(&self) -> Vec<(Descriptor, &UnitToken)> {
        self.positions()
            .into_iter()
            .flat_map(move |pos| {
                self.cell(pos)
                    .units()
                    .map(move |(kind, unit)| (Descriptor::new(kind, pos), unit))
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Store `cell` at `pos` during map loading. Off-board positions are
    /// ignored.
    pub fn place(&mut self, pos: Position, mut cell: Cell) {
        let Some(index) = self.index_of(pos) else {
            error!(position = %pos, "place outside the board ignored");
            return;
        };
        cell.tile.id = self.fresh_id_if(!cell.tile.is_none());
        cell.ground.id = self.fresh_id_if(!cell.ground.is_none());
        cell.air.id = self.fresh_id_if(!cell.air.is_none());
        cell.bypass.id = self.fresh_id_if(!cell.bypass.is_none());
        self.cells[index] = cell;
    }

    /// Overwrite the vision of `pos` without enacting a change. Used by the
    /// automaton when it computes initial sight.
    pub fn set_vision(&mut self, pos: Position, vision: Vision) {
        if let Some(index) = self.index_of(pos) {
            self.visions[index] = vision;
        }
    }

    /// Renumber every token in scan order, starting from 1.
    pub fn reset_ids(&mut self) {
        self.next_id = 1;
        for pos in self.positions() {
            let Some(index) = self.index_of(pos) else {
                continue;
            };
            let mut cell = std::mem::take(&mut self.cells[index]);
            cell.tile.id = self.fresh_id_if(!cell.tile.is_none());
            cell.ground.id = self.fresh_id_if(!cell.ground.is_none());
            cell.air.id = self.fresh_id_if(!cell.air.is_none());
            cell.bypass.id = self.fresh_id_if(!cell.bypass.is_none());
            self.cells[index] = cell;
        }
    }

    fn fresh_id_if(&mut self, occupied: bool) -> u32 {
        if !occupied {
            return 0;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Randomize which player plays which color.
    ///
    /// The colors that own anything on the board, in index order, are
    /// abstract slots. `roster` is shuffled with `rng` and slot *i* becomes
    /// `shuffled[i]`; slots beyond the roster revert to unowned. Returns the
    /// slot mapping.
    pub fn assign_players<R: Rng + ?Sized>(
        &mut self,
        roster: &[Player],
        rng: &mut R,
    ) -> Vec<(Player, Option<Player>)> {
        let slots: Vec<Player> = Player::COLORS
            .into_iter()
            .filter(|color| {
                self.cells.iter().any(|cell| {
                    cell.tile.owner == Some(*color)
                        || cell.units().any(|(_, u)| u.owner == Some(*color))
                })
            })
            .collect();

        let mut shuffled = roster.to_vec();
        shuffled.shuffle(rng);

        let mapping: Vec<(Player, Option<Player>)> = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (*slot, shuffled.get(i).copied()))
            .collect();
        let destination = |owner: Option<Player>| {
            owner.and_then(|o| {
                mapping
                    .iter()
                    .find(|(slot, _)| *slot == o)
                    .map_or(Some(o), |(_, to)| *to)
            })
        };

        for cell in &mut self.cells {
            cell.tile.owner = destination(cell.tile.owner);
            cell.ground.owner = destination(cell.ground.owner);
            cell.air.owner = destination(cell.air.owner);
            cell.bypass.owner = destination(cell.bypass.owner);
        }
        mapping
    }

    // -----------------------------------------------------------------------
    // Enact
    // -----------------------------------------------------------------------

    /// Apply one change. This is the only way simulation state changes.
    ///
    /// Announcements and bookkeeping are no-ops. Changes are expected exactly
    /// once each, in emission order; double application is not defended
    /// against. A change whose subject lies off the board is logged and
    /// ignored.
    pub fn enact(&mut self, change: &Change) {
        if change.is_announcement() {
            return;
        }

        let subject = change.subject();
        if let Change::Corner { subject } = change {
            let cols = subject.position.col.saturating_add(1);
            let rows = subject.position.row.saturating_add(1);
            if !(0..=MAX_COLS).contains(&cols) || !(0..=MAX_ROWS).contains(&rows) {
                warn!(position = %subject.position, "corner outside the largest board clamped");
            }
            self.resize(cols.clamp(0, MAX_COLS), rows.clamp(0, MAX_ROWS));
            return;
        }
        let index = match self.index_of(subject.position) {
            Some(index) if !subject.is_none() => index,
            _ if subject.is_none() => return,
            _ => {
                error!(
                    change = change.wire_name(),
                    position = %subject.position,
                    rows = self.rows,
                    cols = self.cols,
                    "change outside the board ignored"
                );
                return;
            }
        };

        if let Some(hit) = change.hit() {
            self.hit(index, hit.subject.kind, hit.killed, hit.depowered);
            return;
        }

        match change {
            Change::Moves { target, .. } => {
                let Some(to) = self.index_of(target.position) else {
                    error!(position = %target.position, "move target outside the board ignored");
                    return;
                };
                let unit = self.cells[index]
                    .unit_mut(subject.kind)
                    .map(std::mem::take)
                    .unwrap_or_default();
                if unit.is_none() {
                    return;
                }
                if let Some(slot) = self.cells[to].unit_mut(target.kind) {
                    *slot = unit;
                }
            }
            Change::Entered { unit, .. } | Change::Produced { unit, .. } => {
                let id = self.fresh_id_if(!unit.is_none());
                if let Some(slot) = self.cells[index].unit_mut(subject.kind) {
                    *slot = UnitToken {
                        id,
                        ..unit.clone()
                    };
                }
            }
            Change::Exited { .. } | Change::Died { .. } => {
                if let Some(slot) = self.cells[index].unit_mut(subject.kind) {
                    *slot = UnitToken::default();
                }
            }
            Change::Reveal { cell, vision, .. } => {
                let border = self.cells[index].border;
                self.cells[index] = Cell {
                    border: border || cell.border,
                    ..cell.clone()
                };
                let ids = [
                    !cell.tile.is_none(),
                    !cell.ground.is_none(),
                    !cell.air.is_none(),
                    !cell.bypass.is_none(),
                ]
                .map(|occupied| self.fresh_id_if(occupied));
                let target = &mut self.cells[index];
                target.tile.id = ids[0];
                target.ground.id = ids[1];
                target.air.id = ids[2];
                target.bypass.id = ids[3];
                self.visions[index] = *vision;
            }
            Change::Obscure { vision, .. } => {
                self.visions[index] = *vision;
                if !vision.contains(self.perspective) {
                    self.cells[index].forget_units();
                }
            }
            Change::Vision { vision, .. } => {
                self.visions[index] = *vision;
            }
            Change::Transformed { tile, .. }
            | Change::Destroyed { tile, .. }
            | Change::Shaped { tile, .. }
            | Change::Settled { tile, .. }
            | Change::Expanded { tile, .. }
            | Change::Upgraded { tile, .. }
            | Change::Cultivated { tile, .. } => {
                let id = self.fresh_id_if(!tile.is_none());
                self.cells[index].tile = TileToken {
                    id,
                    ..tile.clone()
                };
            }
            Change::Consumed { .. } => match subject.kind {
                DescriptorKind::Tile => self.cells[index].tile = TileToken::default(),
                kind => {
                    if let Some(slot) = self.cells[index].unit_mut(kind) {
                        *slot = UnitToken::default();
                    }
                }
            },
            Change::Grows { stacks, power, .. } => {
                let tile = &self.cells[index].tile;
                let stacks_max = self.bible.tile_stacks_max(&tile.kind);
                let power_max = self.bible.tile_power_max(&tile.kind);
                let stacks = apply_delta(tile.stacks, *stacks, stacks_max);
                let power = apply_delta(tile.power, *power, power_max).min(stacks);
                let tile = &mut self.cells[index].tile;
                tile.stacks = stacks;
                tile.power = power;
            }
            Change::Captured { player, .. } => {
                self.cells[index].tile.owner = Some(*player);
            }
            Change::Snow { snow, .. } => self.cells[index].hazards.snow = *snow,
            Change::Frostbite { frostbite, .. } => {
                self.cells[index].hazards.frostbite = *frostbite;
            }
            Change::Firestorm { firestorm, .. } => {
                self.cells[index].hazards.firestorm = *firestorm;
            }
            Change::Bonedrought { bonedrought, .. } => {
                self.cells[index].hazards.bonedrought = *bonedrought;
            }
            Change::Death { death, .. } => self.cells[index].hazards.death = *death,
            Change::Gas { gas, .. } => {
                let b = self.bible;
                let h = &mut self.cells[index].hazards;
                h.gas = clamp_add(h.gas, *gas, b.gas_min(), b.gas_max());
            }
            Change::Radiation { radiation, .. } => {
                let b = self.bible;
                let h = &mut self.cells[index].hazards;
                h.radiation = clamp_add(h.radiation, *radiation, b.radiation_min(), b.radiation_max());
            }
            Change::Temperature { temperature, .. } => {
                let b = self.bible;
                let h = &mut self.cells[index].hazards;
                h.temperature = clamp_add(
                    h.temperature,
                    *temperature,
                    b.temperature_min(),
                    b.temperature_max(),
                );
            }
            Change::Humidity { humidity, .. } => {
                let b = self.bible;
                let h = &mut self.cells[index].hazards;
                h.humidity = clamp_add(h.humidity, *humidity, b.humidity_min(), b.humidity_max());
            }
            Change::Chaos { chaos, .. } => {
                let b = self.bible;
                let h = &mut self.cells[index].hazards;
                h.chaos = clamp_add(h.chaos, *chaos, b.chaos_min(), b.chaos_max());
            }
            Change::Border { .. } => self.cells[index].border = true,
            // Lifecycle markers with a subject carry no state.
            Change::Discarded { .. } | Change::Postponed { .. } | Change::Unfinished { .. } => {}
            _ => {}
        }
    }

    /// The shared policy behind every combat and hazard-damage tag, keyed on
    /// the kind of slot that was hit.
    fn hit(&mut self, index: usize, kind: DescriptorKind, killed: bool, depowered: bool) {
        let cell = &mut self.cells[index];
        match kind {
            DescriptorKind::Tile => {
                let tile = &mut cell.tile;
                if killed {
                    tile.stacks = tile.stacks.saturating_sub(1);
                }
                if depowered {
                    tile.power = tile.power.saturating_sub(1);
                }
                tile.power = tile.power.min(tile.stacks);
            }
            DescriptorKind::Ground | DescriptorKind::Air | DescriptorKind::Bypass => {
                if let Some(unit) = cell.unit_mut(kind) {
                    if killed {
                        unit.stacks = unit.stacks.saturating_sub(1);
                    }
                }
            }
            // A miss.
            DescriptorKind::Cell | DescriptorKind::None => {}
        }
    }

    // -----------------------------------------------------------------------
    // Checksum
    // -----------------------------------------------------------------------

    /// BLAKE3 hex digest of the dimensions and every cell's tile and unit
    /// kind, owner, stacks and power. Token ids are excluded.
    pub fn checksum(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.rows.to_le_bytes());
        hasher.update(&self.cols.to_le_bytes());
        let owner_byte = |o: Option<Player>| o.map_or(u8::MAX, |p| p.index() as u8);
        for cell in &self.cells[..self.cells.len() - 1] {
            let t = &cell.tile;
            hasher.update(t.kind.as_str().as_bytes());
            hasher.update(&[0, owner_byte(t.owner), t.stacks, t.power]);
            for u in [&cell.ground, &cell.air, &cell.bypass] {
                hasher.update(u.kind.as_str().as_bytes());
                hasher.update(&[0, owner_byte(u.owner), u.stacks, u.power]);
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn apply_delta(value: u8, delta: i8, max: u8) -> u8 {
    let v = value as i16 + delta as i16;
    v.clamp(0, max as i16) as u8
}

fn clamp_add(value: i8, delta: i8, min: i8, max: i8) -> i8 {
    value.saturating_add(delta).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::Hit;
    use crate::token::{TileType, UnitType};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn at(row: i16, col: i16) -> Position {
        Position::new(row, col)
    }

    fn board(bible: &Bible) -> Board<'_> {
        let mut b = Board::new(bible, Player::Observer);
        b.clear(4, 3);
        b
    }

    fn rifleman(bible: &Bible, owner: Player, stacks: u8) -> UnitToken {
        UnitToken::new(bible.unittype("rifleman").unwrap(), Some(owner), stacks)
    }

    fn city(owner: Option<Player>) -> TileToken {
        TileToken::new(TileType::new("city"), owner, 3, 2)
    }

    // -- 1. Geometry ---------------------------------------------------------

    #[test]
    fn new_board_is_empty_with_sentinel() {
        let bible = Bible::standard();
        let b = Board::new(&bible, Player::Observer);
        assert_eq!((b.rows(), b.cols()), (0, 0));
        assert_eq!(b.index_of(at(0, 0)), None);
        assert_eq!(b.cell(at(0, 0)), &Cell::default());
    }

    #[test]
    fn bounds_checking() {
        let bible = Bible::standard();
        let b = board(&bible);
        assert_eq!(b.index_of(at(0, 0)), Some(0));
        assert_eq!(b.index_of(at(2, 3)), Some(11));
        assert_eq!(b.index_of(at(3, 0)), None);
        assert_eq!(b.index_of(at(0, 4)), None);
        assert_eq!(b.index_of(at(-1, 0)), None);
    }

    #[test]
    fn corner_resizes_and_keeps_contents() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.place(at(1, 1), Cell {
            tile: city(Some(Player::Red)),
            ..Cell::default()
        });
        b.enact(&Change::Corner {
            subject: Descriptor::cell(at(5, 5)),
        });
        assert_eq!((b.rows(), b.cols()), (6, 6));
        assert_eq!(b.tile(at(1, 1)).kind.as_str(), "city");
        assert!(b.tile(at(5, 5)).is_none());
    }

    #[test]
    fn positions_follow_scan_order() {
        let mut bible = Bible::standard();
        let b = board(&bible);
        assert_eq!(&b.positions()[..2], &[at(0, 0), at(0, 1)]);
        bible.scan_order = crate::bible::ScanOrder::ColumnMajor;
        let b = board(&bible);
        assert_eq!(&b.positions()[..2], &[at(0, 0), at(1, 0)]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "exceeds")]
    fn oversize_resize_asserts_in_debug() {
        let bible = Bible::standard();
        let mut b = Board::new(&bible, Player::Observer);
        b.resize(MAX_COLS + 1, 4);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn oversize_resize_clamps_in_release() {
        let bible = Bible::standard();
        let mut b = Board::new(&bible, Player::Observer);
        b.resize(MAX_COLS + 10, MAX_ROWS + 10);
        assert_eq!((b.rows(), b.cols()), (MAX_ROWS, MAX_COLS));
    }

    // -- 2. Movement ---------------------------------------------------------

    #[test]
    fn enter_move_exit() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let from = Descriptor::ground(at(0, 0));
        let to = Descriptor::ground(at(0, 1));
        b.enact(&Change::Entered {
            subject: from,
            unit: rifleman(&bible, Player::Red, 2),
        });
        assert_eq!(b.unit(from).stacks, 2);
        assert_ne!(b.unit(from).id, 0);

        b.enact(&Change::Moves {
            subject: from,
            target: to,
        });
        assert!(b.unit(from).is_none());
        assert_eq!(b.unit(to).owner, Some(Player::Red));

        b.enact(&Change::Exited { subject: to });
        assert!(b.unit(to).is_none());
    }

    #[test]
    fn move_then_exit_then_enter_lands_once() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let from = Descriptor::ground(at(1, 1));
        let to = Descriptor::ground(at(1, 2));
        let unit = rifleman(&bible, Player::Blue, 3);
        b.enact(&Change::Entered {
            subject: from,
            unit: unit.clone(),
        });
        b.enact(&Change::Moves {
            subject: from,
            target: to,
        });
        b.enact(&Change::Exited { subject: from });
        b.enact(&Change::Entered { subject: to, unit });
        assert!(b.unit(from).is_none());
        assert_eq!(b.unit(to).stacks, 3);
    }

    // -- 3. Combat policy ----------------------------------------------------

    #[test]
    fn unit_hit_decrements_stacks() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let d = Descriptor::ground(at(2, 2));
        b.enact(&Change::Entered {
            subject: d,
            unit: rifleman(&bible, Player::Red, 2),
        });
        b.enact(&Change::Attacked(Hit::new(d, true, false)));
        assert_eq!(b.unit(d).stacks, 1);
        b.enact(&Change::Gassed(Hit::new(d, true, true)));
        assert_eq!(b.unit(d).stacks, 0);
        b.enact(&Change::Died { subject: d });
        assert!(b.unit(d).is_none());
    }

    #[test]
    fn tile_hit_decrements_stacks_and_power() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.place(at(0, 0), Cell {
            tile: city(Some(Player::Red)),
            ..Cell::default()
        });
        let d = Descriptor::tile(at(0, 0));
        b.enact(&Change::Shelled(Hit::new(d, false, true)));
        assert_eq!((b.tile(at(0, 0)).stacks, b.tile(at(0, 0)).power), (3, 1));
        b.enact(&Change::Bombed(Hit::new(d, true, false)));
        b.enact(&Change::Bombed(Hit::new(d, true, false)));
        // Power never exceeds stacks.
        assert_eq!((b.tile(at(0, 0)).stacks, b.tile(at(0, 0)).power), (1, 1));
    }

    #[test]
    fn cell_hit_is_a_miss() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.place(at(0, 0), Cell {
            tile: city(None),
            ground: rifleman(&bible, Player::Red, 2),
            ..Cell::default()
        });
        let before = b.checksum();
        b.enact(&Change::Attacked(Hit::new(Descriptor::cell(at(0, 0)), true, true)));
        assert_eq!(b.checksum(), before);
    }

    #[test]
    fn legacy_and_modern_hits_enact_identically() {
        let bible = Bible::standard();
        let mut legacy = board(&bible);
        let mut modern = board(&bible);
        for b in [&mut legacy, &mut modern] {
            b.place(at(1, 0), Cell {
                tile: city(Some(Player::Blue)),
                ..Cell::default()
            });
        }
        let old = Change::parse_str(
            r#"{"type":"bombarded","subject":{"type":"tile","row":1,"col":0},"dead":true,"powered":false}"#,
        )
        .unwrap();
        let new = Change::Bombarded(Hit::new(Descriptor::tile(at(1, 0)), true, true));
        legacy.enact(&old);
        modern.enact(&new);
        assert_eq!(legacy.checksum(), modern.checksum());
    }

    // -- 4. Fog --------------------------------------------------------------

    #[test]
    fn reveal_sets_contents_and_vision() {
        let bible = Bible::standard();
        let mut b = Board::new(&bible, Player::Myself);
        b.clear(2, 2);
        let cell = Cell {
            ground: rifleman(&bible, Player::Blue, 1),
            ..Cell::default()
        };
        b.enact(&Change::Reveal {
            subject: Descriptor::cell(at(1, 1)),
            cell,
            vision: Vision::of(Player::Myself),
        });
        assert!(b.perceives(at(1, 1)));
        assert_eq!(b.unit(Descriptor::ground(at(1, 1))).owner, Some(Player::Blue));
    }

    #[test]
    fn obscure_forgets_units_when_perspective_loses_sight() {
        let bible = Bible::standard();
        let mut b = Board::new(&bible, Player::Myself);
        b.clear(2, 2);
        b.enact(&Change::Reveal {
            subject: Descriptor::cell(at(0, 0)),
            cell: Cell {
                tile: city(None),
                ground: rifleman(&bible, Player::Red, 1),
                ..Cell::default()
            },
            vision: Vision::of(Player::Myself),
        });
        b.enact(&Change::Obscure {
            subject: Descriptor::cell(at(0, 0)),
            vision: Vision::of(Player::Red),
        });
        assert!(!b.perceives(at(0, 0)));
        assert!(b.unit(Descriptor::ground(at(0, 0))).is_none());
        // The tile is remembered.
        assert!(!b.tile(at(0, 0)).is_none());
    }

    // -- 5. Hazards and bounds -----------------------------------------------

    #[test]
    fn hazard_deltas_clamp_to_ruleset() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let d = Descriptor::cell(at(0, 0));
        b.enact(&Change::Gas { subject: d, gas: 100 });
        assert_eq!(b.cell(at(0, 0)).hazards.gas, bible.gas_max());
        b.enact(&Change::Gas { subject: d, gas: -100 });
        assert_eq!(b.cell(at(0, 0)).hazards.gas, bible.gas_min());
        b.enact(&Change::Firestorm {
            subject: d,
            firestorm: true,
        });
        assert!(b.cell(at(0, 0)).hazards.firestorm);
    }

    #[test]
    fn out_of_bounds_change_is_ignored() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let before = b.checksum();
        b.enact(&Change::Entered {
            subject: Descriptor::ground(at(10, 10)),
            unit: rifleman(&bible, Player::Red, 1),
        });
        assert_eq!(b.checksum(), before);
    }

    #[test]
    fn far_corner_clamps_to_the_largest_board() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.enact(&Change::Corner {
            subject: Descriptor::cell(at(i16::MAX, i16::MAX)),
        });
        assert_eq!((b.cols(), b.rows()), (MAX_COLS, MAX_ROWS));
    }

    #[test]
    fn announcements_do_not_mutate() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        let before = b.checksum();
        b.enact(&Change::Shapes {
            subject: Descriptor::ground(at(0, 0)),
            tiletype: TileType::new("farm"),
        });
        b.enact(&Change::Attacks {
            subject: Descriptor::ground(at(0, 0)),
            target: Descriptor::ground(at(0, 1)),
        });
        assert_eq!(b.checksum(), before);
    }

    // -- 6. Player assignment ------------------------------------------------

    #[test]
    fn assign_players_maps_slots_in_index_order() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.place(at(0, 0), Cell {
            tile: city(Some(Player::Red)),
            ..Cell::default()
        });
        b.place(at(2, 3), Cell {
            tile: city(Some(Player::Blue)),
            ground: rifleman(&bible, Player::Blue, 1),
            ..Cell::default()
        });
        let mut rng = Pcg64::seed_from_u64(7);
        let mapping = b.assign_players(&[Player::Teal, Player::Pink], &mut rng);
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping[0].0, Player::Red);
        assert_eq!(mapping[1].0, Player::Blue);
        let owners = [b.tile(at(0, 0)).owner, b.tile(at(2, 3)).owner];
        assert!(owners.contains(&Some(Player::Teal)));
        assert!(owners.contains(&Some(Player::Pink)));
        assert_eq!(
            b.unit(Descriptor::ground(at(2, 3))).owner,
            b.tile(at(2, 3)).owner
        );
    }

    #[test]
    fn assign_players_without_destination_reverts_to_neutral() {
        let bible = Bible::standard();
        let mut b = board(&bible);
        b.place(at(0, 0), Cell {
            tile: city(Some(Player::Red)),
            ..Cell::default()
        });
        b.place(at(0, 1), Cell {
            tile: city(Some(Player::Blue)),
            ..Cell::default()
        });
        let mut rng = Pcg64::seed_from_u64(1);
        b.assign_players(&[Player::Yellow], &mut rng);
        let owners = [b.tile(at(0, 0)).owner, b.tile(at(0, 1)).owner];
        assert_eq!(owners.iter().filter(|o| o.is_none()).count(), 1);
        assert!(owners.contains(&Some(Player::Yellow)));
    }

    #[test]
    fn assign_players_is_deterministic_per_seed() {
        let bible = Bible::standard();
        let setup = || {
            let mut b = board(&bible);
            b.place(at(0, 0), Cell {
                tile: city(Some(Player::Red)),
                ..Cell::default()
            });
            b.place(at(1, 1), Cell {
                tile: city(Some(Player::Blue)),
                ..Cell::default()
            });
            b
        };
        let roster = [Player::Red, Player::Blue, Player::Teal];
        let mut a = setup();
        let mut b = setup();
        a.assign_players(&roster, &mut Pcg64::seed_from_u64(42));
        b.assign_players(&roster, &mut Pcg64::seed_from_u64(42));
        assert_eq!(a.checksum(), b.checksum());
    }

    // -- 7. Checksum ---------------------------------------------------------

    #[test]
    fn checksum_ignores_ids_and_vision() {
        let bible = Bible::standard();
        let mut a = board(&bible);
        let mut b = board(&bible);
        let unit = UnitToken::new(UnitType::new("tank"), Some(Player::Red), 2);
        a.enact(&Change::Entered {
            subject: Descriptor::ground(at(0, 0)),
            unit: unit.clone(),
        });
        b.enact(&Change::Entered {
            subject: Descriptor::ground(at(1, 1)),
            unit: unit.clone(),
        });
        b.enact(&Change::Entered {
            subject: Descriptor::ground(at(0, 0)),
            unit,
        });
        b.enact(&Change::Died {
            subject: Descriptor::ground(at(1, 1)),
        });
        b.set_vision(at(0, 0), Vision::everyone());
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 64);
    }
}
