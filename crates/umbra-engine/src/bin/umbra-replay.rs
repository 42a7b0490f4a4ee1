//! Umbra Replay - play a recording back and report the final board.
//!
//! ```text
//! umbra-replay games/duel.rec
//! umbra-replay --roots roots.json --ruleset standard duel
//! umbra-replay games/duel.rec --player red --expect 5b1f...
//! ```
//!
//! With `--player`, the projection each batch would have sent to that
//! identity is printed as one JSON array per line. The checksum of the
//! replayed board is always printed last. With `--expect`, a mismatching
//! checksum exits with status 1.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use umbra_engine::config::{AutomatonConfig, ResourceRoots};
use umbra_engine::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "umbra-replay", author, version, about = "Replay an Umbra recording")]
struct Args {
    /// Recording file, or a recording name when --roots is given.
    recording: String,

    /// JSON file with the maps, rulesets and recordings directories.
    #[arg(long)]
    roots: Option<PathBuf>,

    /// Ruleset file, or a ruleset name when --roots is given. The built-in
    /// standard ruleset is used otherwise.
    #[arg(short, long)]
    ruleset: Option<String>,

    /// Print the projection for this identity (a color, observer or blind).
    #[arg(short, long)]
    player: Option<Player>,

    /// Expected checksum of the final board.
    #[arg(short, long)]
    expect: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let roots = args
        .roots
        .as_deref()
        .map(ResourceRoots::load)
        .transpose()
        .context("loading resource roots")?;

    let recording_path = match &roots {
        Some(roots) => roots.recording_path(&args.recording),
        None => PathBuf::from(&args.recording),
    };
    let bible = match (&args.ruleset, &roots) {
        (Some(name), Some(roots)) => Bible::load(&roots.ruleset_path(name))?,
        (Some(path), None) => Bible::load(&PathBuf::from(path))?,
        (None, _) => Bible::standard(),
    };

    let recording = Recording::load(&recording_path)
        .with_context(|| format!("loading recording '{}'", recording_path.display()))?;
    info!(
        map = %recording.metadata.map,
        ruleset = %recording.metadata.ruleset,
        lines = recording.lines.len(),
        "replaying"
    );

    let mut automaton = Automaton::new(&bible, Vec::new(), AutomatonConfig::default());
    automaton.replay(recording);

    let mut batches = 0usize;
    while automaton.active() {
        let set = automaton.act()?;
        batches += 1;
        if let Some(player) = args.player {
            println!("{}", set.encode_for(player));
        }
    }
    automaton.hibernate()?;
    debug!(batches, phase = %automaton.phase(), "replay finished");

    let checksum = automaton.checksum();
    println!("{checksum}");

    match args.expect {
        Some(expected) if expected != checksum => {
            eprintln!("checksum mismatch: expected {expected}, replayed {checksum}");
            Ok(ExitCode::FAILURE)
        }
        Some(_) | None => {
            if automaton.is_gameover() {
                info!(winner = ?automaton.winner(), "recorded game ended");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
