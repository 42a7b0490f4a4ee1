//! Recording files: a persisted change log that can be replayed.
//!
//! A recording is a text file. The first line is a JSON [`Metadata`] object
//! (map name, ruleset name, player roster, engine version). Every following
//! line is one [`Change`], or, in legacy map saves, one cell-state object
//! without a `"type"` key:
//!
//! ```text
//! {"map":"duel","ruleset":"standard","players":["red","blue"],"version":"0.1.0"}
//! {"type":"corner","subject":{"type":"cell","row":5,"col":5}}
//! {"type":"year","year":1}
//! ```
//!
//! [`RecordingWriter`] produces this format from the observer projection of
//! each [`ChangeSet`]; [`Recording::parse`] reads it back. Unparsable change
//! lines are dropped with a warning unless the reader is strict.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use umbra_board::cell::Cell;
use umbra_board::change::Change;
use umbra_board::player::Player;
use umbra_board::position::Position;
use umbra_board::ParseError;

use crate::changeset::ChangeSet;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to read or write a recording.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("recording I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open recording '{path}': {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("recording is empty")]
    Empty,

    #[error("invalid recording metadata: {details}")]
    InvalidMetadata { details: String },

    /// Only produced by strict readers.
    #[error("line {line}: {source}")]
    BadLine { line: usize, source: ParseError },
}

// ---------------------------------------------------------------------------
// Metadata and lines
// ---------------------------------------------------------------------------

/// The first line of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub map: String,
    pub ruleset: String,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub version: String,
}

/// One body line of a recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Change(Change),
    /// A legacy map-save line: the full state of one cell.
    Cell { position: Position, cell: Cell },
}

#[derive(Serialize, Deserialize)]
struct CellLine {
    row: i16,
    col: i16,
    #[serde(flatten)]
    cell: Cell,
}

impl Line {
    fn parse(value: &Value) -> Result<Line, ParseError> {
        if value.get("type").is_some() {
            return Change::parse(value).map(Line::Change);
        }
        let line = CellLine::deserialize(value).map_err(|e| ParseError::Malformed {
            tag: "cell".to_owned(),
            details: e.to_string(),
        })?;
        Ok(Line::Cell {
            position: Position::new(line.row, line.col),
            cell: line.cell,
        })
    }
}

// ---------------------------------------------------------------------------
// Recording
// ---------------------------------------------------------------------------

/// A parsed recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub metadata: Metadata,
    pub lines: Vec<Line>,
}

impl Recording {
    /// Parse recording text, dropping bad body lines with a warning.
    pub fn parse(text: &str) -> Result<Recording, RecordingError> {
        Self::parse_with(text, false)
    }

    /// Parse recording text, failing on the first bad body line.
    pub fn parse_strict(text: &str) -> Result<Recording, RecordingError> {
        Self::parse_with(text, true)
    }

    /// Parse recording text. A missing or invalid metadata line is always an
    /// error; bad body lines are errors only when `strict`.
    pub fn parse_with(text: &str, strict: bool) -> Result<Recording, RecordingError> {
        let mut numbered = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (_, header) = numbered.next().ok_or(RecordingError::Empty)?;
        let metadata: Metadata =
            serde_json::from_str(header).map_err(|e| RecordingError::InvalidMetadata {
                details: e.to_string(),
            })?;

        let mut lines = Vec::new();
        for (number, text) in numbered {
            let parsed = serde_json::from_str::<Value>(text)
                .map_err(ParseError::from)
                .and_then(|value| Line::parse(&value));
            match parsed {
                Ok(line) => lines.push(line),
                Err(source) if strict => {
                    return Err(RecordingError::BadLine {
                        line: number,
                        source,
                    })
                }
                Err(e) => {
                    warn!(line = number, error = %e, "dropping unparsable recording line");
                }
            }
        }

        Ok(Recording { metadata, lines })
    }

    /// Read and parse a recording file (lenient).
    pub fn load(path: &Path) -> Result<Recording, RecordingError> {
        let text = std::fs::read_to_string(path).map_err(|source| RecordingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// The change lines, in file order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.lines.iter().filter_map(|l| match l {
            Line::Change(c) => Some(c),
            Line::Cell { .. } => None,
        })
    }

    /// The legacy cell lines, in file order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, &Cell)> {
        self.lines.iter().filter_map(|l| match l {
            Line::Cell { position, cell } => Some((*position, cell)),
            Line::Change(_) => None,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingWriter
// ---------------------------------------------------------------------------

/// Appends change sets to a recording as they are produced.
#[derive(Debug)]
pub struct RecordingWriter<W: Write> {
    out: W,
    lines: usize,
}

impl RecordingWriter<BufWriter<File>> {
    /// Create (or truncate) a recording file and write its metadata line.
    pub fn create(path: &Path, metadata: &Metadata) -> Result<Self, RecordingError> {
        let file = File::create(path).map_err(|source| RecordingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(BufWriter::new(file), metadata)
    }
}

impl<W: Write> RecordingWriter<W> {
    /// Wrap `out` and write the metadata line.
    pub fn new(mut out: W, metadata: &Metadata) -> Result<Self, RecordingError> {
        let header = serde_json::to_string(metadata).map_err(|e| RecordingError::InvalidMetadata {
            details: e.to_string(),
        })?;
        writeln!(out, "{header}")?;
        Ok(Self { out, lines: 1 })
    }

    /// Append one change line.
    pub fn write_change(&mut self, change: &Change) -> Result<(), RecordingError> {
        writeln!(self.out, "{change}")?;
        self.lines += 1;
        Ok(())
    }

    /// Append the observer projection of `set`.
    pub fn write_set(&mut self, set: &ChangeSet) -> Result<(), RecordingError> {
        for change in set.get(Player::Observer) {
            self.write_change(&change)?;
        }
        Ok(())
    }

    /// Append a legacy cell-state line.
    pub fn write_cell(&mut self, position: Position, cell: &Cell) -> Result<(), RecordingError> {
        let line = CellLine {
            row: position.row,
            col: position.col,
            cell: cell.clone(),
        };
        let text = serde_json::to_string(&line).map_err(ParseError::from).map_err(|source| {
            RecordingError::BadLine {
                line: self.lines + 1,
                source,
            }
        })?;
        writeln!(self.out, "{text}")?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far, metadata included.
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> Result<(), RecordingError> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
