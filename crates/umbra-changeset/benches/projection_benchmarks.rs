//! Projection fan-out benchmark.
//!
//! One authoritative change set is projected for every consumer a live game
//! serves: eight colors, the blind spectator and the observer. The set mimics
//! a busy action step on a full-size board: movement triples, fog updates,
//! announcements with their hits and private bookkeeping.
//!
//! Run with: `cargo bench --bench projection_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use umbra_board::prelude::*;
use umbra_changeset::ChangeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A deterministic vision annotation: one or two colors plus the observer.
fn vision_for(i: usize) -> Vision {
    let mut vision = Vision::of(Player::Observer);
    vision.add(Player::COLORS[i % 8]);
    if i % 3 == 0 {
        vision.add(Player::COLORS[(i + 3) % 8]);
    }
    vision
}

/// Build a change set of roughly `steps` movement-sized groups.
fn busy_step(steps: usize) -> ChangeSet {
    let mut set = ChangeSet::new();
    let tank = UnitType::new("tank");
    for i in 0..steps {
        let row = (i / MAX_COLS as usize) as i16 % MAX_ROWS;
        let col = (i % MAX_COLS as usize) as i16;
        let from = Position::new(row, col);
        let to = Position::new(row, (col + 1) % MAX_COLS);
        let owner = Player::COLORS[i % 8];
        let vision = vision_for(i);

        set.push(
            Change::Moves {
                subject: Descriptor::ground(from),
                target: Descriptor::ground(to),
            },
            vision,
        );
        set.push(
            Change::Entered {
                subject: Descriptor::ground(to),
                unit: UnitToken::new(tank.clone(), Some(owner), 2),
            },
            vision_for(i + 1),
        );
        set.push(
            Change::Reveal {
                subject: Descriptor::cell(to),
                cell: Cell::default(),
                vision: vision.union(vision_for(i + 1)),
            },
            vision_for(i + 1),
        );
        set.push(
            Change::Attacks {
                subject: Descriptor::ground(to),
                target: Descriptor::ground(from),
            },
            vision,
        );
        set.push(
            Change::Attacked(Hit::new(Descriptor::ground(from), true, false)),
            vision_for(i + 2),
        );
        set.push(
            Change::Funds {
                player: owner,
                money: i as i32,
            },
            Vision::of(owner),
        );
    }
    set
}

fn consumers() -> Vec<Player> {
    Player::COLORS
        .iter()
        .copied()
        .chain([Player::Blind, Player::Observer])
        .collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Project one large set for every consumer.
fn bench_fan_out(c: &mut Criterion) {
    let set = busy_step(1_000);
    let consumers = consumers();

    c.bench_function("projection_fan_out_6k_entries", |b| {
        b.iter(|| {
            for &player in &consumers {
                black_box(set.get(player));
            }
        });
    });
}

/// Project for a single color as the set grows.
fn bench_projection_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("projection_scaling");

    for &steps in &[100usize, 500, 1000, 2000] {
        let set = busy_step(steps);
        group.bench_with_input(BenchmarkId::from_parameter(set.len()), &set, |b, set| {
            b.iter(|| black_box(set.get(Player::Red)));
        });
    }

    group.finish();
}

/// Projection plus the JSON encoding that crosses the wire.
fn bench_encode_for(c: &mut Criterion) {
    let set = busy_step(1_000);

    c.bench_function("encode_for_red_6k_entries", |b| {
        b.iter(|| black_box(set.encode_for(Player::Red).len()));
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(benches, bench_fan_out, bench_projection_scaling, bench_encode_for);
criterion_main!(benches);
