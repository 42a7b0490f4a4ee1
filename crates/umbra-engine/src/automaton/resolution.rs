//! The units of work behind [`Automaton::act`] in a live game: order passes,
//! the weather step and the growth step.
//!
//! The authoritative board only changes by enacting a change that is also
//! logged. Changes that describe an already enacted mutation to other
//! observers (`exited`, `entered`, `reveal`, `obscure`) are logged without
//! being enacted.

use tracing::{debug, trace};
use umbra_board::change::{Change, Hit};
use umbra_board::descriptor::{Descriptor, DescriptorKind};
use umbra_board::phase::Phase;
use umbra_board::player::Player;
use umbra_board::position::Position;
use umbra_board::token::{TileToken, TileType, UnitToken};
use umbra_board::vision::Vision;
use umbra_changeset::ChangeSet;

use super::{Automaton, Stage};
use crate::order::Order;

/// Outcome of one order within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Progressed,
    Blocked,
}

impl<'b> Automaton<'b> {
    // -----------------------------------------------------------------------
    // Order passes
    // -----------------------------------------------------------------------

    /// Give every unfinished order one turn, in locked order.
    pub(super) fn order_pass(&mut self) -> ChangeSet {
        let mut set = ChangeSet::new();
        self.passes += 1;

        let mut progressed = false;
        let mut postponed: Vec<usize> = Vec::new();
        for index in 0..self.queue.len() {
            if self.queue[index].done {
                continue;
            }
            match self.resolve(&mut set, index) {
                Step::Progressed => progressed = true,
                Step::Blocked => postponed.push(index),
            }
        }

        // Nobody moved, so nobody blocking will move either.
        if !progressed {
            for index in postponed {
                self.abandon(&mut set, index, |subject| Change::Discarded { subject });
            }
        }
        if self.passes >= self.config.max_passes {
            for index in 0..self.queue.len() {
                if !self.queue[index].done {
                    self.abandon(&mut set, index, |subject| Change::Unfinished { subject });
                }
            }
        }
        self.announce_finished(&mut set);

        trace!(pass = self.passes, changes = set.len(), "order pass");
        if self.queue.iter().all(|p| p.done) {
            self.stage = Stage::Weather;
        }
        set
    }

    fn resolve(&mut self, set: &mut ChangeSet, index: usize) -> Step {
        if !self.subject_holds(index) {
            self.abandon(set, index, |subject| Change::Discarded { subject });
            return Step::Progressed;
        }
        if matches!(self.queue[index].order, Order::Move { .. }) {
            return self.step_move(set, index);
        }

        let player = self.queue[index].player;
        let order = self.queue[index].order.clone();
        if self.execute(set, player, &order) {
            self.queue[index].done = true;
        } else {
            self.abandon(set, index, |subject| Change::Discarded { subject });
        }
        self.refresh_sight(set);
        Step::Progressed
    }

    /// Whether the subject is still the token the order was given to.
    fn subject_holds(&self, index: usize) -> bool {
        let pending = &self.queue[index];
        let at = pending.at;
        let (occupied, id, owner) = if at.is_unit() {
            let unit = self.board.unit(at);
            (!unit.is_none(), unit.id, unit.owner)
        } else {
            let tile = self.board.tile(at.position);
            (!tile.is_none(), tile.id, tile.owner)
        };
        occupied && id == pending.id && owner == Some(pending.player)
    }

    /// Mark an order done and tell its player how it ended.
    fn abandon(&mut self, set: &mut ChangeSet, index: usize, marker: fn(Descriptor) -> Change) {
        let pending = &mut self.queue[index];
        pending.done = true;
        let change = marker(pending.at);
        let player = pending.player;
        debug!(player = %player, change = change.wire_name(), subject = ?pending.at, "order ended early");
        set.push(change, Vision::of(player));
    }

    fn announce_finished(&mut self, set: &mut ChangeSet) {
        let roster = self.roster.clone();
        for player in roster {
            if self.finished.contains(player) {
                continue;
            }
            let mut orders = self.queue.iter().filter(|p| p.player == player).peekable();
            if orders.peek().is_none() {
                continue;
            }
            if orders.all(|p| p.done) {
                self.finished.add(player);
                self.emit_public(set, Change::Finished { player });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Movement
    // -----------------------------------------------------------------------

    /// Take one step along a move order's path.
    fn step_move(&mut self, set: &mut ChangeSet, index: usize) -> Step {
        let at = self.queue[index].at;
        let player = self.queue[index].player;
        let steps = self.queue[index].steps;
        let Order::Move { moves, .. } = &self.queue[index].order else {
            return Step::Progressed;
        };
        let total = moves.len();
        let next = moves.get(usize::from(steps)).copied();
        let Some(mv) = next else {
            self.queue[index].done = true;
            return Step::Progressed;
        };

        let unit = self.board.unit(at);
        let (speed, air, trample) = self
            .bible
            .unit(&unit.kind)
            .map_or((1, false, false), |def| (def.speed, def.air, def.abilities.trample));

        if !self.queue[index].started {
            self.queue[index].started = true;
            self.emit_at(set, Change::Starts { subject: at }, at.position);
        }

        let to = at.position.step(mv);
        if !self.board.contains(to) || !(air || self.walkable(to)) {
            self.abandon(set, index, |subject| Change::Discarded { subject });
            return Step::Progressed;
        }
        let target = at.moved_to(to);
        if !self.board.unit(target).is_none() {
            let occupant_busy = self.queue.iter().any(|p| !p.done && p.at == target);
            if occupant_busy {
                set.push(Change::Postponed { subject: at }, Vision::of(player));
                return Step::Blocked;
            }
            self.abandon(set, index, |subject| Change::Discarded { subject });
            return Step::Progressed;
        }

        self.move_unit(set, at, target);
        let pending = &mut self.queue[index];
        pending.at = target;
        pending.steps += 1;
        let steps = pending.steps;

        if trample {
            self.trample(set, target, player);
        }
        self.refresh_sight(set);

        if usize::from(steps) >= total {
            self.queue[index].done = true;
        } else if steps >= speed {
            self.abandon(set, index, |subject| Change::Unfinished { subject });
        }
        Step::Progressed
    }

    /// Move a unit into an empty slot of the same layer, telling every
    /// observer as much as they can see of it.
    fn move_unit(&mut self, set: &mut ChangeSet, from: Descriptor, to: Descriptor) {
        let seen_from = self.board.vision(from.position);
        let seen_to = self.board.vision(to.position);
        let unit = self.board.unit(from).clone();

        self.board.enact(&Change::Moves {
            subject: from,
            target: to,
        });
        set.push(
            Change::Moves {
                subject: from,
                target: to,
            },
            seen_from.intersection(seen_to),
        );
        let only_origin = seen_from.difference(seen_to);
        if !only_origin.is_empty() {
            set.push(Change::Exited { subject: from }, only_origin);
        }
        let only_destination = seen_to.difference(seen_from);
        if !only_destination.is_empty() {
            set.push(Change::Entered { subject: to, unit }, only_destination);
        }
    }

    fn trample(&mut self, set: &mut ChangeSet, subject: Descriptor, player: Player) {
        let pos = subject.position;
        let tile = self.board.tile(pos);
        if tile.owner.is_none() || tile.owner == Some(player) || tile.stacks == 0 {
            return;
        }
        let target = Descriptor::tile(pos);
        self.emit_at(set, Change::Tramples { subject, target }, pos);
        self.strike(set, target, 1, Change::Trampled);
    }

    fn walkable(&self, pos: Position) -> bool {
        let tile = self.board.tile(pos);
        tile.is_none() || self.bible.tile(&tile.kind).is_some_and(|def| def.walkable)
    }

    // -----------------------------------------------------------------------
    // Single-shot orders
    // -----------------------------------------------------------------------

    /// Carry out a non-move order. Returns false when the order has to be
    /// discarded; nothing is emitted in that case.
    fn execute(&mut self, set: &mut ChangeSet, player: Player, order: &Order) -> bool {
        match order {
            Order::Move { .. } | Order::Halt { .. } => true,
            Order::Focus { subject, target } => {
                let (stacks, attack) = self.firepower(*subject);
                let (from, to) = (subject.position, target.position);
                self.announce(set, Change::Aims { subject: *subject, target: *target }, from, to);
                self.announce(set, Change::Attacks { subject: *subject, target: *target }, from, to);
                let hits = u16::from(stacks) * u16::from(attack);
                self.strike(set, *target, hits, Change::Attacked);
                true
            }
            Order::Shell { subject, target } => {
                let (_, attack) = self.firepower(*subject);
                let (from, to) = (subject.position, target.position);
                self.announce(set, Change::Shells { subject: *subject, target: *target }, from, to);
                self.strike(set, *target, u16::from(attack.max(1)), Change::Shelled);
                true
            }
            Order::Bombard { subject, target } => {
                let (_, attack) = self.firepower(*subject);
                let (from, to) = (subject.position, target.position);
                self.announce(set, Change::Bombards { subject: *subject, target: *target }, from, to);
                self.strike(set, *target, u16::from(attack.max(1)), Change::Bombarded);
                true
            }
            Order::Bomb { subject } => {
                let (_, attack) = self.firepower(*subject);
                let target = self.aim(Descriptor::cell(subject.position));
                self.emit_at(set, Change::Bombs { subject: *subject, target }, subject.position);
                self.strike(set, target, u16::from(attack.max(1)), Change::Bombed);
                true
            }
            Order::Capture { subject } => {
                let pos = subject.position;
                let tile = self.board.tile(pos);
                if tile.is_none() || tile.owner == Some(player) {
                    return false;
                }
                let target = Descriptor::tile(pos);
                self.emit_at(set, Change::Captures { subject: *subject, target }, pos);
                self.emit_at(set, Change::Captured { subject: target, player }, pos);
                true
            }
            Order::Shape { subject, tiletype } | Order::Settle { subject, tiletype } => {
                let pos = subject.position;
                if self.board.tile(pos).owner.is_some_and(|owner| owner != player) {
                    return false;
                }
                let cost = self.tile_cost(tiletype);
                if !self.can_afford(player, cost) {
                    return false;
                }
                let built = self.build(tiletype, player);
                let tile = Descriptor::tile(pos);
                if matches!(order, Order::Shape { .. }) {
                    let tiletype = tiletype.clone();
                    self.emit_at(set, Change::Shapes { subject: *subject, tiletype }, pos);
                    self.pay(set, player, cost);
                    self.emit_at(set, Change::Shaped { subject: tile, tile: built }, pos);
                } else {
                    let tiletype = tiletype.clone();
                    self.emit_at(set, Change::Settles { subject: *subject, tiletype }, pos);
                    self.pay(set, player, cost);
                    self.emit_at(set, Change::Consumed { subject: *subject }, pos);
                    self.emit_at(set, Change::Settled { subject: tile, tile: built }, pos);
                }
                true
            }
            Order::Upgrade { subject, tiletype } => {
                let pos = subject.position;
                let cost = self.tile_cost(tiletype);
                if !self.can_afford(player, cost) {
                    return false;
                }
                let current = self.board.tile(pos);
                let (stacks, power) = (current.stacks, current.power);
                let stacks_max = self.bible.tile_stacks_max(tiletype);
                let power_max = self.bible.tile_power_max(tiletype);
                let upgraded = TileToken::new(
                    tiletype.clone(),
                    Some(player),
                    stacks.min(stacks_max),
                    power.min(power_max),
                );
                let tiletype = tiletype.clone();
                self.emit_at(set, Change::Upgrades { subject: *subject, tiletype }, pos);
                self.pay(set, player, cost);
                self.emit_at(set, Change::Upgraded { subject: *subject, tile: upgraded }, pos);
                true
            }
            Order::Expand {
                subject,
                target,
                tiletype,
            }
            | Order::Cultivate {
                subject,
                target,
                tiletype,
            } => {
                let to = target.position;
                if self.board.tile(to).owner.is_some() || !self.walkable(to) {
                    return false;
                }
                let cost = self.tile_cost(tiletype);
                if !self.can_afford(player, cost) {
                    return false;
                }
                let built = self.build(tiletype, player);
                let from = subject.position;
                let (subject, target, tiletype) = (*subject, *target, tiletype.clone());
                let destination = Descriptor::tile(to);
                if matches!(order, Order::Expand { .. }) {
                    self.announce(set, Change::Expands { subject, target, tiletype }, from, to);
                    self.pay(set, player, cost);
                    self.emit_at(set, Change::Expanded { subject: destination, tile: built }, to);
                } else {
                    self.announce(set, Change::Cultivates { subject, target, tiletype }, from, to);
                    self.pay(set, player, cost);
                    self.emit_at(set, Change::Cultivated { subject: destination, tile: built }, to);
                }
                true
            }
            Order::Produce {
                subject,
                target,
                unittype,
            } => {
                let Some(def) = self.bible.unit(unittype) else {
                    return false;
                };
                let to = target.position;
                let layer = if def.air {
                    DescriptorKind::Air
                } else {
                    DescriptorKind::Ground
                };
                let slot = Descriptor::new(layer, to);
                if !self.board.unit(slot).is_none() || !(def.air || self.walkable(to)) {
                    return false;
                }
                if !self.can_afford(player, def.cost) {
                    return false;
                }
                let (cost, unit) = (
                    def.cost,
                    UnitToken::new(
                        unittype.clone(),
                        Some(player),
                        self.bible.unit_stacks_max(unittype),
                    ),
                );
                let produces = Change::Produces {
                    subject: *subject,
                    target: *target,
                    unittype: unittype.clone(),
                };
                self.announce(set, produces, subject.position, to);
                self.pay(set, player, cost);
                self.emit_at(set, Change::Produced { subject: slot, unit }, to);
                true
            }
        }
    }

    /// (stacks, attack strength) of the unit at `subject`.
    fn firepower(&self, subject: Descriptor) -> (u8, u8) {
        let unit = self.board.unit(subject);
        let attack = self.bible.unit(&unit.kind).map_or(0, |def| def.attack);
        (unit.stacks, attack)
    }

    /// Log an order's announcement for whoever sees the cell it was given
    /// from. Observers who see only `to` get it without the subject.
    fn announce(&mut self, set: &mut ChangeSet, change: Change, from: Position, to: Position) {
        let origin = self.board.vision(from);
        let glimpse = self.board.vision(to);
        self.board.enact(&change);
        set.push_glimpsed(change, origin, glimpse);
    }

    /// Resolve a whole-cell target to the slot that takes the hit: the
    /// ground unit if there is one, otherwise the tile.
    fn aim(&self, target: Descriptor) -> Descriptor {
        if target.kind != DescriptorKind::Cell {
            return target;
        }
        let ground = Descriptor::ground(target.position);
        if !self.board.unit(ground).is_none() {
            ground
        } else if !self.board.tile(target.position).is_none() {
            Descriptor::tile(target.position)
        } else {
            target
        }
    }

    /// Deal up to `hits` hits to `target`, removing what reaches zero
    /// stacks. A target with nothing to hit gets a single miss.
    fn strike(&mut self, set: &mut ChangeSet, target: Descriptor, hits: u16, wrap: fn(Hit) -> Change) {
        let target = self.aim(target);
        let pos = target.position;
        let miss = || wrap(Hit::new(Descriptor::cell(pos), false, false));

        if target.is_unit() {
            let stacks = self.board.unit(target).stacks;
            if self.board.unit(target).is_none() || stacks == 0 {
                self.emit_at(set, miss(), pos);
                return;
            }
            for _ in 0..hits.min(u16::from(stacks)) {
                self.emit_at(set, wrap(Hit::new(target, true, false)), pos);
            }
            if self.board.unit(target).stacks == 0 {
                self.emit_at(set, Change::Died { subject: target }, pos);
            } else {
                self.emit_at(set, Change::Survived { subject: target }, pos);
            }
        } else if target.kind == DescriptorKind::Tile {
            let tile = self.board.tile(pos);
            let (stacks, kind) = (tile.stacks, tile.kind.clone());
            if tile.is_none() || stacks == 0 {
                self.emit_at(set, miss(), pos);
                return;
            }
            for _ in 0..hits.min(u16::from(stacks)) {
                self.emit_at(set, wrap(Hit::new(target, true, true)), pos);
            }
            if self.board.tile(pos).stacks == 0 {
                let remnant = self
                    .bible
                    .tile(&kind)
                    .and_then(|def| def.destroyed.clone())
                    .map(|rest| TileToken::new(rest, None, 0, 0))
                    .unwrap_or_default();
                self.emit_at(
                    set,
                    Change::Destroyed {
                        subject: target,
                        tile: remnant,
                    },
                    pos,
                );
            }
        } else {
            self.emit_at(set, miss(), pos);
        }
    }

    // -----------------------------------------------------------------------
    // Economy
    // -----------------------------------------------------------------------

    fn tile_cost(&self, kind: &TileType) -> i32 {
        self.bible.tile(kind).map_or(0, |def| def.cost)
    }

    /// A freshly built tile of `kind` for `player`.
    fn build(&self, kind: &TileType, player: Player) -> TileToken {
        let stacks = self.bible.tile_stacks_max(kind).min(1);
        let power = self.bible.tile_power_max(kind).min(1);
        TileToken::new(kind.clone(), Some(player), stacks, power)
    }

    fn can_afford(&self, player: Player, cost: i32) -> bool {
        cost <= 0 || self.funds(player) >= cost
    }

    fn pay(&mut self, set: &mut ChangeSet, player: Player, cost: i32) {
        if cost <= 0 {
            return;
        }
        let funds = &mut self.funds[player.index()];
        *funds -= cost;
        let money = *funds;
        set.push(Change::Expenditure { player, money: cost }, Vision::of(player));
        set.push(Change::Funds { player, money }, Vision::of(player));
    }

    // -----------------------------------------------------------------------
    // Weather and growth
    // -----------------------------------------------------------------------

    /// Hazards take their toll, then the phase moves on to GROWTH.
    pub(super) fn weather(&mut self) -> ChangeSet {
        let mut set = ChangeSet::new();
        for pos in self.board.positions() {
            let hazards = self.board.cell(pos).hazards;
            let cell = Descriptor::cell(pos);
            let ground = Descriptor::ground(pos);
            let tile = Descriptor::tile(pos);

            if hazards.gas > 0 {
                if self.holds(ground) {
                    self.strike(&mut set, ground, 1, Change::Gassed);
                }
                self.emit_at(&mut set, Change::Gas { subject: cell, gas: -1 }, pos);
            }
            if hazards.radiation > 0 {
                let target = self.aim(cell);
                if self.holds(target) {
                    self.strike(&mut set, target, 1, Change::Irradiated);
                }
            }
            if hazards.frostbite && self.holds(ground) {
                self.strike(&mut set, ground, 1, Change::Frostbitten);
            }
            if hazards.firestorm {
                if self.holds(tile) {
                    self.strike(&mut set, tile, 1, Change::Burned);
                }
                if self.holds(ground) {
                    self.strike(&mut set, ground, 1, Change::Burned);
                }
                self.emit_at(&mut set, Change::Chaos { subject: cell, chaos: 1 }, pos);
                self.emit_at(
                    &mut set,
                    Change::Firestorm {
                        subject: cell,
                        firestorm: false,
                    },
                    pos,
                );
            }
            if hazards.death && self.holds(ground) {
                self.emit_at(&mut set, Change::Died { subject: ground }, pos);
            }
        }
        self.refresh_sight(&mut set);
        self.stage = Stage::Growth;
        self.enter(&mut set, Phase::Growth);
        set
    }

    /// Whether `desc` names something that can take a hit.
    fn holds(&self, desc: Descriptor) -> bool {
        if desc.is_unit() {
            !self.board.unit(desc).is_none()
        } else if desc.kind == DescriptorKind::Tile {
            let tile = self.board.tile(desc.position);
            !tile.is_none() && tile.stacks > 0
        } else {
            false
        }
    }

    /// Owned growing tiles gain a stack and a power, then the round rests.
    pub(super) fn growth(&mut self) -> ChangeSet {
        let mut set = ChangeSet::new();
        for pos in self.board.positions() {
            let tile = self.board.tile(pos);
            let grows = self.bible.tile(&tile.kind).is_some_and(|def| def.grows);
            if tile.owner.is_none() || !grows {
                continue;
            }
            let stacks_max = self.bible.tile_stacks_max(&tile.kind);
            let power_max = self.bible.tile_power_max(&tile.kind);
            let stacks = i8::from(tile.stacks < stacks_max);
            let power = i8::from(tile.power < power_max && tile.power < tile.stacks + stacks as u8);
            if stacks == 0 && power == 0 {
                continue;
            }
            let subject = Descriptor::tile(pos);
            self.emit_at(&mut set, Change::Grows { subject, stacks, power }, pos);
        }
        self.stage = Stage::Done;
        self.enter(&mut set, Phase::Resting);
        set
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
