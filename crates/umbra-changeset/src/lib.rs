//! Umbra ChangeSet - Vision-filtered change logs and recordings.
//!
//! This crate turns the total change log of one automaton step into the
//! subsequence each consumer is allowed to see, and persists change logs as
//! replayable recordings.
//!
//! # Modules
//!
//! - [`changeset`]: ordered (change, vision) log with per-observer
//!   projection, redaction and SELF framing.
//! - [`recording`]: the line-oriented recording format (metadata line, then
//!   one change or legacy cell line per line), with a reader and a writer.

#![deny(unsafe_code)]

pub mod changeset;
pub mod recording;

pub use changeset::{ChangeSet, Entry};
pub use recording::{Line, Metadata, Recording, RecordingError, RecordingWriter};
