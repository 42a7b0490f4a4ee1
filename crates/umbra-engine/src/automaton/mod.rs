//! The authoritative phase state machine.
//!
//! An [`Automaton`] owns the authoritative [`Board`] and advances it through
//! the turn cycle. Every public step returns the [`ChangeSet`] it produced;
//! the automaton keeps no history of its own.
//!
//! ```text
//!   load ──▶ GROWTH ──act──▶ RESTING ──hibernate──▶ PLANNING ──awake──▶ STAGING
//!                               ▲                     (receive)           │
//!                               │                                      prepare
//!                               └────────act (until inactive)──── ACTION ◀┘
//!
//!   replay ──▶ GROWTH/ACTION ──act (until inactive)──▶ RESTING ──hibernate──▶ DECAY
//! ```
//!
//! Calls made in the wrong phase fail with [`AutomatonError::WrongPhase`] and
//! change nothing; once the game is over every mutating call fails with
//! [`AutomatonError::GameOver`].
//!
//! # Determinism
//!
//! Given the same ruleset, map, config and accepted orders, every step emits
//! the same changes in the same order. Orders are executed in the ruleset's
//! scan order of their subjects, never in arrival order, and no iteration
//! depends on hashing.

mod replay;
mod resolution;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use tracing::{debug, error, info, warn};
use umbra_board::bible::Bible;
use umbra_board::board::Board;
use umbra_board::change::Change;
use umbra_board::descriptor::Descriptor;
use umbra_board::phase::{Daytime, Phase, Season};
use umbra_board::player::Player;
use umbra_board::position::Position;
use umbra_board::vision::Vision;
use umbra_board::ParseError;
use umbra_changeset::{ChangeSet, Metadata, RecordingError, RecordingWriter};

use crate::challenge::Challenge;
use crate::config::AutomatonConfig;
use crate::map::Map;
use crate::order::{Order, OrderError};
use crate::sight;
use crate::LoadError;

use self::replay::ReplayCursor;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of an automaton call. The automaton is unchanged when one is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum AutomatonError {
    #[error("call requires phase {expected}, but the automaton is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("there is no work left in phase {phase}")]
    Inactive { phase: Phase },

    #[error("the game is over")]
    GameOver,

    #[error("{player} does not play in this game")]
    NotInGame { player: Player },

    #[error("orders could not be parsed: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

// ---------------------------------------------------------------------------
// Receipt
// ---------------------------------------------------------------------------

/// The outcome of one order submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Receipt {
    /// Number of orders kept for the next action phase.
    pub accepted: usize,
    /// Index into the submission and the reason, for every rejected order.
    pub rejected: Vec<(usize, OrderError)>,
}

impl Receipt {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// In-game date. Each round advances the daytime; two daytimes make a
/// season and four seasons a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    pub year: i16,
    pub season: Season,
    pub daytime: Daytime,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            year: 1,
            season: Season::Spring,
            daytime: Daytime::Early,
        }
    }
}

impl Calendar {
    fn advance(&mut self) {
        match self.daytime {
            Daytime::Early => self.daytime = Daytime::Late,
            Daytime::Late => {
                self.daytime = Daytime::Early;
                self.season = self.season.next();
                if self.season == Season::Spring {
                    self.year += 1;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

/// Remaining work of the current growth or action phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Setup,
    Orders,
    Weather,
    Growth,
    Done,
}

/// One locked order during the action phase.
#[derive(Debug, Clone)]
struct Pending {
    player: Player,
    order: Order,
    /// Where the subject is now; moves update it step by step.
    at: Descriptor,
    /// Token id of the subject when the order was locked.
    id: u32,
    steps: u8,
    started: bool,
    done: bool,
}

// ---------------------------------------------------------------------------
// Automaton
// ---------------------------------------------------------------------------

/// The authoritative game: board, phase, economy and the order pipeline.
pub struct Automaton<'b> {
    bible: &'b Bible,
    config: AutomatonConfig,
    /// The colors taking part, in join order. The first one plays the
    /// challenge, if any.
    roster: Vec<Player>,
    board: Board<'b>,
    phase: Phase,
    stage: Stage,
    map_name: String,
    challenge: Option<Challenge>,
    calendar: Calendar,
    round: u32,
    funds: [i32; 8],
    scores: [i32; 8],
    defeated: Vision,
    /// Players who submitted orders since the last prepare.
    submitted: Vision,
    orders: BTreeMap<Player, Vec<Order>>,
    queue: Vec<Pending>,
    passes: u32,
    finished: Vision,
    gameover: bool,
    winner: Option<Player>,
    replay: Option<ReplayCursor>,
    recording: Option<RecordingWriter<Box<dyn Write>>>,
}

impl<'b> Automaton<'b> {
    /// Create an automaton for `roster`. Nothing is on the board until a map
    /// is loaded or a recording replayed.
    ///
    /// Identities that are not colors and duplicate colors are dropped from
    /// the roster.
    pub fn new(bible: &'b Bible, roster: Vec<Player>, config: AutomatonConfig) -> Self {
        let mut players: Vec<Player> = Vec::with_capacity(roster.len());
        for player in roster {
            if !player.is_color() || players.contains(&player) {
                warn!(player = %player, "ignoring roster entry");
                continue;
            }
            players.push(player);
        }
        Self {
            bible,
            config,
            roster: players,
            board: Board::new(bible, Player::Observer),
            phase: Phase::Growth,
            stage: Stage::Done,
            map_name: String::new(),
            challenge: None,
            calendar: Calendar::default(),
            round: 0,
            funds: [0; 8],
            scores: [0; 8],
            defeated: Vision::none(),
            submitted: Vision::none(),
            orders: BTreeMap::new(),
            queue: Vec::new(),
            passes: 0,
            finished: Vision::none(),
            gameover: false,
            winner: None,
            replay: None,
            recording: None,
        }
    }

    /// Attach a challenge. Takes effect at the next [`load`](Self::load).
    pub fn with_challenge(mut self, challenge: Challenge) -> Self {
        self.challenge = Some(challenge);
        self
    }

    /// Start a new game on `map`.
    ///
    /// The board is filled from the map, players are assigned to the map's
    /// colors (shuffled with the configured seed when
    /// [`AutomatonConfig::shuffle_players`] is set), initial sight is
    /// computed and the automaton enters GROWTH with the setup work queued.
    pub fn load(&mut self, map: &Map) -> Result<(), AutomatonError> {
        map.check(self.bible)?;

        self.board = Board::new(self.bible, Player::Observer);
        self.board.clear(map.cols, map.rows);
        for (pos, cell) in map.iter() {
            self.board.place(pos, cell.clone());
        }
        if self.config.shuffle_players {
            let mut rng = Pcg64::seed_from_u64(self.config.seed);
            for (slot, player) in self.board.assign_players(&self.roster, &mut rng) {
                debug!(slot = %slot, player = ?player, "assigned map color");
            }
        }
        self.board.reset_ids();
        for (pos, vision) in sight::compute(&self.board) {
            self.board.set_vision(pos, vision);
        }

        let starting_funds = self
            .challenge
            .as_ref()
            .and_then(|c| c.initial_funds)
            .unwrap_or(self.bible.starting_funds);
        self.funds = [0; 8];
        for player in &self.roster {
            self.funds[player.index()] = starting_funds;
        }
        self.map_name = map.name.clone();
        self.reset_game();
        self.phase = Phase::Growth;
        self.stage = Stage::Setup;
        info!(map = %map.name, players = self.roster.len(), "map loaded");
        Ok(())
    }

    fn reset_game(&mut self) {
        self.calendar = Calendar::default();
        self.round = 0;
        self.scores = [0; 8];
        self.defeated = Vision::none();
        self.submitted = Vision::none();
        self.orders.clear();
        self.queue.clear();
        self.passes = 0;
        self.finished = Vision::none();
        self.gameover = false;
        self.winner = None;
        self.replay = None;
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    /// Record every change set produced from now on to `out`, starting with
    /// the metadata line.
    pub fn start_recording<W: Write + 'static>(&mut self, out: W) -> Result<(), RecordingError> {
        let metadata = Metadata {
            map: self.map_name.clone(),
            ruleset: self.bible.name.clone(),
            players: self.roster.clone(),
            version: self.config.version.clone(),
        };
        let out: Box<dyn Write> = Box::new(out);
        self.recording = Some(RecordingWriter::new(out, &metadata)?);
        Ok(())
    }

    /// Record to a new file at `path`.
    pub fn record_to(&mut self, path: &Path) -> Result<(), RecordingError> {
        let file = File::create(path).map_err(|source| RecordingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.start_recording(BufWriter::new(file))
    }

    /// Flush and close the recording, if one is running.
    pub fn finish_recording(&mut self) -> Result<(), RecordingError> {
        match self.recording.take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Append `set` to the recording. A failing recording is dropped; the
    /// game goes on.
    fn record(&mut self, set: &ChangeSet) {
        let Some(writer) = self.recording.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_set(set).and_then(|()| writer.flush()) {
            error!(error = %e, "recording failed, no further changes will be recorded");
            self.recording = None;
        }
    }

    // -----------------------------------------------------------------------
    // Phase steps
    // -----------------------------------------------------------------------

    /// Whether [`act`](Self::act) has work to do.
    pub fn active(&self) -> bool {
        if !matches!(self.phase, Phase::Growth | Phase::Action) {
            return false;
        }
        match &self.replay {
            Some(cursor) => !cursor.is_exhausted(),
            None => self.stage != Stage::Done,
        }
    }

    /// Perform one unit of work: the setup broadcast, one order pass, the
    /// weather step or the growth step. The phase becomes RESTING after the
    /// last unit.
    pub fn act(&mut self) -> Result<ChangeSet, AutomatonError> {
        self.ensure_running()?;
        if !self.active() {
            return Err(match self.phase {
                Phase::Growth | Phase::Action => AutomatonError::Inactive { phase: self.phase },
                actual => AutomatonError::WrongPhase {
                    expected: Phase::Action,
                    actual,
                },
            });
        }
        if self.replay.is_some() {
            return Ok(self.replay_batch());
        }

        let set = match self.stage {
            Stage::Setup => self.setup(),
            Stage::Orders => self.order_pass(),
            Stage::Weather => self.weather(),
            Stage::Growth => self.growth(),
            Stage::Done => ChangeSet::new(),
        };
        self.record(&set);
        Ok(set)
    }

    /// The broadcast that brings every consumer from an empty board to the
    /// loaded map.
    fn setup(&mut self) -> ChangeSet {
        let mut set = ChangeSet::new();
        self.snapshot(&mut set);
        self.push_calendar(&mut set);
        for &player in &self.roster {
            set.push(
                Change::Funds {
                    player,
                    money: self.funds[player.index()],
                },
                Vision::of(player),
            );
        }
        self.stage = Stage::Done;
        self.enter(&mut set, Phase::Resting);
        set
    }

    /// RESTING → PLANNING: advance the calendar, pay income, score, detect
    /// defeats and decide whether the game is over.
    ///
    /// For a replay this ends the replay instead (RESTING → DECAY).
    pub fn hibernate(&mut self) -> Result<ChangeSet, AutomatonError> {
        self.ensure_running()?;
        self.expect_phase(Phase::Resting)?;
        let mut set = ChangeSet::new();
        if self.replay.is_some() {
            self.enter(&mut set, Phase::Decay);
            return Ok(set);
        }

        self.advance_calendar(&mut set);
        self.collect_income(&mut set);
        self.tally_scores(&mut set);
        self.detect_defeats(&mut set);
        self.decide_outcome(&mut set);
        if !self.gameover {
            for player in self.live_players() {
                self.emit_public(&mut set, Change::Sleeping { player });
            }
            self.enter(&mut set, Phase::Planning);
        }
        self.round += 1;
        self.record(&set);
        Ok(set)
    }

    /// PLANNING → STAGING: acknowledge who ordered and re-arm the round.
    pub fn awake(&mut self) -> Result<ChangeSet, AutomatonError> {
        self.ensure_running()?;
        self.expect_phase(Phase::Planning)?;
        let mut set = ChangeSet::new();
        for player in self.live_players() {
            if self.submitted.contains(player) {
                self.emit_public(&mut set, Change::Ordered { player });
            }
        }
        self.queue.clear();
        self.passes = 0;
        self.finished = Vision::none();
        self.enter(&mut set, Phase::Staging);
        self.record(&set);
        Ok(set)
    }

    /// STAGING → ACTION: lock the received orders in the ruleset's scan
    /// order of their subjects (then by layer) and start resolution.
    pub fn prepare(&mut self) -> Result<ChangeSet, AutomatonError> {
        self.ensure_running()?;
        self.expect_phase(Phase::Staging)?;
        let mut set = ChangeSet::new();

        let scan = self.bible.scan_order;
        let mut queue: Vec<Pending> = Vec::new();
        let mut acting: Vec<Player> = Vec::new();
        for (player, orders) in std::mem::take(&mut self.orders) {
            if self.defeated.contains(player) || orders.is_empty() {
                continue;
            }
            acting.push(player);
            queue.extend(orders.into_iter().map(|order| {
                let at = order.subject();
                Pending {
                    player,
                    id: self.token_id(at),
                    at,
                    order,
                    steps: 0,
                    started: false,
                    done: false,
                }
            }));
        }
        queue.sort_by_key(|p| (scan.key(p.at.position), p.at.layer_rank()));
        debug!(orders = queue.len(), "orders locked");
        self.queue = queue;
        self.submitted = Vision::none();
        self.passes = 0;

        self.enter(&mut set, Phase::Action);
        for player in acting {
            self.emit_public(&mut set, Change::Acting { player });
        }
        if let Some(first) = self.queue.first() {
            self.emit_public(&mut set, Change::Initiative { player: first.player });
        }
        self.stage = if self.queue.is_empty() {
            Stage::Weather
        } else {
            Stage::Orders
        };
        self.record(&set);
        Ok(set)
    }

    // -----------------------------------------------------------------------
    // Order intake
    // -----------------------------------------------------------------------

    /// Buffer `player`'s orders for the next action phase.
    ///
    /// Each order is validated against the current board; invalid ones are
    /// listed in the receipt and dropped. The valid ones replace anything
    /// the player submitted earlier this round. Orders from a defeated
    /// player are accepted but never executed.
    pub fn receive(&mut self, player: Player, orders: Vec<Order>) -> Result<Receipt, AutomatonError> {
        self.ensure_running()?;
        if !matches!(self.phase, Phase::Planning | Phase::Staging) {
            return Err(AutomatonError::WrongPhase {
                expected: Phase::Planning,
                actual: self.phase,
            });
        }
        if !self.roster.contains(&player) {
            return Err(AutomatonError::NotInGame { player });
        }
        if self.defeated.contains(player) {
            debug!(player = %player, orders = orders.len(), "orders from a defeated player ignored");
            return Ok(Receipt {
                accepted: orders.len(),
                rejected: Vec::new(),
            });
        }

        let mut receipt = Receipt::default();
        let mut kept: Vec<Order> = Vec::with_capacity(orders.len());
        for (index, order) in orders.into_iter().enumerate() {
            let subject = order.subject();
            let verdict = if kept.iter().any(|o| o.subject() == subject) {
                Err(OrderError::DuplicateSubject { subject })
            } else {
                order.validate(&self.board, player)
            };
            match verdict {
                Ok(()) => kept.push(order),
                Err(e) => {
                    warn!(player = %player, index, error = %e, "order rejected");
                    receipt.rejected.push((index, e));
                }
            }
        }
        receipt.accepted = kept.len();
        self.orders.insert(player, kept);
        self.submitted.add(player);
        Ok(receipt)
    }

    /// Parse a JSON array of orders and [`receive`](Self::receive) them.
    pub fn receive_json(&mut self, player: Player, json: &str) -> Result<Receipt, AutomatonError> {
        let orders = Order::parse_orders(json).map_err(ParseError::from)?;
        self.receive(player, orders)
    }

    // -----------------------------------------------------------------------
    // Rejoin
    // -----------------------------------------------------------------------

    /// A change set that brings an empty replica for `player` to the current
    /// state, as far as `player` may see it.
    ///
    /// The set is built from the current board, not from history. It is
    /// addressed to `player`, whose private bookkeeping is annotated for
    /// [`Player::Myself`].
    pub fn rejoin(&self, player: Player) -> ChangeSet {
        let mut set = ChangeSet::addressed_to(player);
        self.snapshot(&mut set);
        self.push_calendar(&mut set);
        set.push(Change::Phase { phase: self.phase }, Vision::everyone());
        if self.roster.contains(&player) {
            set.push(
                Change::Funds {
                    player,
                    money: self.funds[player.index()],
                },
                Vision::of(Player::Myself),
            );
        }
        for &p in &self.roster {
            set.push(
                Change::Scored {
                    player: p,
                    score: self.scores[p.index()],
                },
                Vision::everyone(),
            );
            if self.defeated.contains(p) {
                set.push(Change::Defeat { player: p }, Vision::everyone());
            }
        }
        if let Some(winner) = self.winner {
            set.push(Change::Victory { player: winner }, Vision::everyone());
        }
        if self.gameover {
            set.push(Change::Gameover, Vision::everyone());
        }
        set
    }

    /// Geometry, borders and the contents of every cell, each annotated with
    /// the cell's current vision.
    fn snapshot(&self, set: &mut ChangeSet) {
        if self.board.rows() == 0 || self.board.cols() == 0 {
            return;
        }
        let corner = Position::new(self.board.rows() - 1, self.board.cols() - 1);
        set.push(
            Change::Corner {
                subject: Descriptor::cell(corner),
            },
            Vision::everyone(),
        );
        let positions = self.board.positions();
        for &pos in &positions {
            if self.board.cell(pos).border {
                set.push(
                    Change::Border {
                        subject: Descriptor::cell(pos),
                    },
                    Vision::everyone(),
                );
            }
        }
        for &pos in &positions {
            let vision = self.board.vision(pos);
            set.push(
                Change::Reveal {
                    subject: Descriptor::cell(pos),
                    cell: self.board.cell(pos).clone(),
                    vision,
                },
                vision,
            );
        }
    }

    fn push_calendar(&self, set: &mut ChangeSet) {
        let Calendar {
            year,
            season,
            daytime,
        } = self.calendar;
        set.push(Change::Year { year }, Vision::everyone());
        set.push(Change::Season { season }, Vision::everyone());
        set.push(Change::Daytime { daytime }, Vision::everyone());
    }

    // -----------------------------------------------------------------------
    // End of round
    // -----------------------------------------------------------------------

    fn advance_calendar(&mut self, set: &mut ChangeSet) {
        let before = self.calendar;
        self.calendar.advance();
        let now = self.calendar;
        self.emit_public(set, Change::Daytime { daytime: now.daytime });
        if now.season == before.season {
            return;
        }
        self.emit_public(set, Change::Season { season: now.season });
        if now.year != before.year {
            self.emit_public(set, Change::Year { year: now.year });
        }

        let winter_starts = now.season == Season::Winter;
        let winter_ends = before.season == Season::Winter;
        for pos in self.board.positions() {
            let hazards = self.board.cell(pos).hazards;
            let subject = Descriptor::cell(pos);
            let (snow, frostbite) = if winter_starts {
                (
                    hazards.snow || hazards.temperature <= self.bible.snow_threshold,
                    hazards.frostbite || hazards.temperature <= self.bible.frostbite_threshold,
                )
            } else if winter_ends {
                (false, false)
            } else {
                (hazards.snow, hazards.frostbite)
            };
            if snow != hazards.snow {
                self.emit_at(set, Change::Snow { subject, snow }, pos);
            }
            if frostbite != hazards.frostbite {
                self.emit_at(set, Change::Frostbite { subject, frostbite }, pos);
            }
        }
    }

    fn collect_income(&mut self, set: &mut ChangeSet) {
        for player in self.live_players() {
            let income: i32 = self
                .owned_tiles(player)
                .iter()
                .map(|(def_income, _, power)| def_income * i32::from(*power))
                .sum();
            if income == 0 {
                continue;
            }
            let funds = &mut self.funds[player.index()];
            *funds = funds.saturating_add(income);
            let money = *funds;
            set.push(Change::Income { player, money: income }, Vision::of(player));
            set.push(Change::Funds { player, money }, Vision::of(player));
        }
    }

    fn tally_scores(&mut self, set: &mut ChangeSet) {
        for player in self.live_players() {
            let score: i32 = self.owned_tiles(player).iter().map(|(_, score, _)| score).sum();
            self.scores[player.index()] = score;
            self.emit_public(set, Change::Scored { player, score });
        }
    }

    /// (income, score, power) of every tile `player` owns.
    fn owned_tiles(&self, player: Player) -> Vec<(i32, i32, u8)> {
        self.board
            .positions()
            .into_iter()
            .filter_map(|pos| {
                let tile = self.board.tile(pos);
                if tile.owner != Some(player) {
                    return None;
                }
                let def = self.bible.tile(&tile.kind)?;
                Some((def.income, def.score, tile.power))
            })
            .collect()
    }

    fn detect_defeats(&mut self, set: &mut ChangeSet) {
        for player in self.live_players() {
            let binding = self.board.positions().into_iter().any(|pos| {
                let tile = self.board.tile(pos);
                tile.owner == Some(player)
                    && self.bible.tile(&tile.kind).is_some_and(|def| def.binding)
            });
            if !binding {
                info!(player = %player, round = self.round, "player defeated");
                self.defeated.add(player);
                self.emit_public(set, Change::Defeat { player });
            }
        }
    }

    fn decide_outcome(&mut self, set: &mut ChangeSet) {
        let live = self.live_players();
        if let Some(challenge) = self.challenge.clone() {
            let Some(&challenger) = self.roster.first() else {
                return;
            };
            let score = self.scores[challenger.index()];
            let lost = self.defeated.contains(challenger);
            if !lost && challenge.target_reached(score) {
                self.declare_victory(set, challenger);
            } else if !lost && !challenge.out_of_time(self.calendar.year) {
                return;
            }
            let stars = if lost { 0 } else { challenge.stars_for(score) };
            self.emit_public(
                set,
                Change::Award {
                    player: challenger,
                    stars,
                },
            );
            self.declare_gameover(set);
        } else if self.roster.len() > 1 && live.len() <= 1 {
            if let Some(&survivor) = live.first() {
                self.declare_victory(set, survivor);
            }
            self.declare_gameover(set);
        } else if live.is_empty() {
            self.declare_gameover(set);
        }
    }

    fn declare_victory(&mut self, set: &mut ChangeSet, player: Player) {
        self.winner = Some(player);
        self.emit_public(set, Change::Victory { player });
    }

    fn declare_gameover(&mut self, set: &mut ChangeSet) {
        self.gameover = true;
        self.emit_public(set, Change::Gameover);
        info!(round = self.round, winner = ?self.winner, "game over");
    }

    // -----------------------------------------------------------------------
    // Emission helpers
    // -----------------------------------------------------------------------

    /// Enact `change` on the authoritative board and log it for `vision`.
    fn emit(&mut self, set: &mut ChangeSet, change: Change, vision: Vision) {
        self.board.enact(&change);
        set.push(change, vision);
    }

    /// Emit for whoever currently sees `pos`.
    fn emit_at(&mut self, set: &mut ChangeSet, change: Change, pos: Position) {
        let vision = self.board.vision(pos);
        self.emit(set, change, vision);
    }

    fn emit_public(&mut self, set: &mut ChangeSet, change: Change) {
        self.emit(set, change, Vision::everyone());
    }

    fn enter(&mut self, set: &mut ChangeSet, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.emit_public(set, Change::Phase { phase });
    }

    /// Bring the board's vision in line with current sight. Observers who
    /// lose sight of a cell get an `obscure`, observers who gain it a
    /// `reveal` of its contents.
    fn refresh_sight(&mut self, set: &mut ChangeSet) {
        for (pos, vision) in sight::compute(&self.board) {
            let old = self.board.vision(pos);
            if old == vision {
                continue;
            }
            let lost = old.difference(vision);
            let gained = vision.difference(old);
            let subject = Descriptor::cell(pos);
            self.board.set_vision(pos, vision);
            if !lost.is_empty() {
                set.push(Change::Obscure { subject, vision }, lost);
            }
            if !gained.is_empty() {
                let cell = self.board.cell(pos).clone();
                set.push(
                    Change::Reveal {
                        subject,
                        cell,
                        vision,
                    },
                    gained,
                );
            }
        }
    }

    fn ensure_running(&self) -> Result<(), AutomatonError> {
        if self.gameover && self.replay.is_none() {
            Err(AutomatonError::GameOver)
        } else {
            Ok(())
        }
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), AutomatonError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(AutomatonError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn token_id(&self, desc: Descriptor) -> u32 {
        if desc.is_unit() {
            self.board.unit(desc).id
        } else {
            self.board.tile(desc.position).id
        }
    }

    fn live_players(&self) -> Vec<Player> {
        self.roster
            .iter()
            .copied()
            .filter(|p| !self.defeated.contains(*p))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn bible(&self) -> &'b Bible {
        self.bible
    }

    pub fn board(&self) -> &Board<'b> {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Completed rounds.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn funds(&self, player: Player) -> i32 {
        self.funds.get(player.index()).copied().unwrap_or(0)
    }

    pub fn score(&self, player: Player) -> i32 {
        self.scores.get(player.index()).copied().unwrap_or(0)
    }

    pub fn is_defeated(&self, player: Player) -> bool {
        self.defeated.contains(player)
    }

    pub fn is_gameover(&self) -> bool {
        self.gameover
    }

    pub fn winner(&self) -> Option<Player> {
        self.winner
    }

    pub fn is_replay(&self) -> bool {
        self.replay.is_some()
    }

    /// Orders buffered for `player` since the last prepare.
    pub fn pending_orders(&self, player: Player) -> &[Order] {
        self.orders.get(&player).map_or(&[], Vec::as_slice)
    }

    /// Checksum of the authoritative board.
    pub fn checksum(&self) -> String {
        self.board.checksum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
