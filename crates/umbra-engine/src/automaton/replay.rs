//! Playback of recordings.
//!
//! A replaying automaton enacts recorded changes instead of resolving
//! orders. Each [`act`](Automaton::act) returns the recorded changes up to
//! and including the next `phase` marker, so consumers see the same batches
//! a live game produced. Once the recording is exhausted the automaton rests,
//! and [`hibernate`](Automaton::hibernate) ends the replay in DECAY.
//!
//! Recordings hold the observer projection, so every entry is re-annotated
//! with the vision it most plausibly had: private bookkeeping goes to its
//! player, board changes to whoever sees the cell on the replay board.

use std::collections::VecDeque;
use std::path::Path;

use tracing::{info, warn};
use umbra_board::board::Board;
use umbra_board::change::Change;
use umbra_board::descriptor::Descriptor;
use umbra_board::phase::Phase;
use umbra_board::player::Player;
use umbra_board::position::{MAX_COLS, MAX_ROWS};
use umbra_board::vision::Vision;
use umbra_changeset::{ChangeSet, Line, Recording};

use super::{Automaton, AutomatonError, Stage};
use crate::LoadError;

/// The recorded lines not yet played back.
#[derive(Debug, Default)]
pub(super) struct ReplayCursor {
    lines: VecDeque<Line>,
}

impl ReplayCursor {
    pub(super) fn is_exhausted(&self) -> bool {
        self.lines.is_empty()
    }

    fn pop(&mut self) -> Option<Line> {
        self.lines.pop_front()
    }
}

impl<'b> Automaton<'b> {
    /// Switch to playing back `recording` on an empty board.
    ///
    /// The roster becomes the recorded players. Any live game state is
    /// discarded.
    pub fn replay(&mut self, recording: Recording) {
        let Recording { metadata, lines } = recording;
        if metadata.ruleset != self.bible.name {
            warn!(
                recorded = %metadata.ruleset,
                loaded = %self.bible.name,
                "replaying with a different ruleset"
            );
        }

        let mut roster: Vec<Player> = Vec::with_capacity(metadata.players.len());
        for player in metadata.players {
            if player.is_color() && !roster.contains(&player) {
                roster.push(player);
            }
        }
        self.roster = roster;
        self.board = Board::new(self.bible, Player::Observer);
        self.map_name = metadata.map;
        self.funds = [0; 8];
        self.reset_game();
        info!(map = %self.map_name, lines = lines.len(), "replay started");
        // An empty recording has nothing to play; it rests on the empty board.
        self.phase = if lines.is_empty() {
            Phase::Resting
        } else {
            Phase::Growth
        };
        self.replay = Some(ReplayCursor {
            lines: lines.into(),
        });
        self.stage = Stage::Done;
    }

    /// Load a recording file and [`replay`](Self::replay) it.
    pub fn replay_file(&mut self, path: &Path) -> Result<(), AutomatonError> {
        let recording = Recording::load(path).map_err(LoadError::from)?;
        self.replay(recording);
        Ok(())
    }

    /// Play back lines up to and including the next phase marker.
    pub(super) fn replay_batch(&mut self) -> ChangeSet {
        let mut set = ChangeSet::new();
        while let Some(line) = self.replay.as_mut().and_then(ReplayCursor::pop) {
            let change = match line {
                Line::Change(change) => change,
                Line::Cell { position, cell } => {
                    // Legacy map saves carry no corner; grow the board to fit.
                    let cols = self.board.cols().max(position.col.saturating_add(1));
                    let rows = self.board.rows().max(position.row.saturating_add(1));
                    if (1..=MAX_COLS).contains(&cols) && (1..=MAX_ROWS).contains(&rows) {
                        self.board.resize(cols, rows);
                    }
                    Change::Reveal {
                        subject: Descriptor::cell(position),
                        cell,
                        vision: Vision::everyone(),
                    }
                }
            };
            let vision = self.replay_vision(&change);
            let glimpse = self.replay_glimpse(&change);
            let marker = matches!(change, Change::Phase { .. });
            self.board.enact(&change);
            self.track(&change);
            set.push_glimpsed(change, vision, glimpse);
            if marker {
                break;
            }
        }

        let exhausted = self.replay.as_ref().map_or(true, ReplayCursor::is_exhausted);
        self.phase = if exhausted { Phase::Resting } else { Phase::Action };
        set
    }

    /// The vision a recorded change is re-emitted with.
    fn replay_vision(&self, change: &Change) -> Vision {
        match change {
            Change::Funds { player, .. }
            | Change::Income { player, .. }
            | Change::Expenditure { player, .. } => Vision::of(*player),
            Change::Reveal { subject, vision, .. } => vision
                .union(self.board.vision(subject.position))
                .union(Vision::of(Player::Observer)),
            Change::Corner { .. } | Change::Border { .. } => Vision::everyone(),
            _ => {
                let subject = change.subject();
                if subject.is_none() {
                    Vision::everyone()
                } else {
                    self.board
                        .vision(subject.position)
                        .union(Vision::of(Player::Observer))
                }
            }
        }
    }

    /// Who sees only the target of a recorded announcement.
    fn replay_glimpse(&self, change: &Change) -> Vision {
        let target = change.target();
        if change.is_announcement() && !target.is_none() {
            self.board.vision(target.position)
        } else {
            Vision::none()
        }
    }

    /// Mirror the bookkeeping a live automaton keeps outside the board.
    fn track(&mut self, change: &Change) {
        match change {
            Change::Funds { player, money } => {
                if let Some(funds) = self.funds.get_mut(player.index()) {
                    *funds = *money;
                }
            }
            Change::Scored { player, score } => {
                if let Some(slot) = self.scores.get_mut(player.index()) {
                    *slot = *score;
                }
            }
            Change::Defeat { player } => self.defeated.add(*player),
            Change::Victory { player } => self.winner = Some(*player),
            Change::Gameover => self.gameover = true,
            Change::Year { year } => self.calendar.year = *year,
            Change::Season { season } => self.calendar.season = *season,
            Change::Daytime { daytime } => self.calendar.daytime = *daytime,
            Change::Phase {
                phase: Phase::Planning,
            } => self.round += 1,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
