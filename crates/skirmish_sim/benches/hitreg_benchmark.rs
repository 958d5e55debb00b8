//! # Hit Registration Benchmark
//!
//! Budget per decision tick at 60 Hz is 16.6ms. Hit registration runs for
//! every execution of every avatar, against a rewound history frame.
//!
//! Run with: `cargo bench --package skirmish_sim`

// Benchmarks don't need docs
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use skirmish_core::{EntityId, Peer, Tick};
use skirmish_shared::{Button, Character, Side, SimConfig, TickInput, Vec3};
use skirmish_sim::{
    Attacker, Collider, HistoryIndex, Hitbox, LagCompensator, ParticipantId, Ray, Simulation, Slot,
    TargetKind,
};

const HISTORY: u32 = 120;

/// A history with `actors` moving volumes per tick and a few walls.
fn populated_history(actors: u32) -> HistoryIndex {
    let mut index = HistoryIndex::new(HISTORY);
    for i in 0..8 {
        let x = -20.0 + 5.0 * i as f32;
        index.add_collider(Collider::from_center(
            Vec3::new(x, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.2),
            None,
        ));
    }
    for t in 0..HISTORY {
        let drift = t as f32 * 0.05;
        let hitboxes = (0..actors).flat_map(|i| {
            let base = Vec3::new(i as f32 * 2.0 - actors as f32, 0.0, 10.0 + drift);
            [
                Hitbox {
                    owner: EntityId::new(i, 0),
                    center: base + Vec3::Y,
                    radius: 0.5,
                    multiplier: 1.0,
                },
                Hitbox {
                    owner: EntityId::new(i, 0),
                    center: base + Vec3::Y * 1.7,
                    radius: 0.25,
                    multiplier: 2.0,
                },
            ]
        });
        index.record(Tick(t), hitboxes);
    }
    index
}

fn attacker() -> Attacker {
    Attacker {
        entity: EntityId::new(999, 0),
        side: Side::Attackers,
        author: Some(Slot(0)),
    }
}

fn classify(_: EntityId) -> Option<TargetKind> {
    Some(TargetKind::Avatar(Side::Defenders))
}

fn bench_hitscan(c: &mut Criterion) {
    let mut group = c.benchmark_group("hitscan");
    for actors in [10u32, 30, 100] {
        let index = populated_history(actors);
        let mut lag = LagCompensator::new(HISTORY);
        lag.set_latency(Slot(0), 12);
        let rays = [Ray::new(Vec3::Y * 1.5, Vec3::Z, 300.0)];
        group.bench_with_input(BenchmarkId::from_parameter(actors), &actors, |b, _| {
            b.iter(|| {
                black_box(lag.resolve_hitscan(&index, &attacker(), &rays, 10.0, Tick(HISTORY - 1), classify))
            });
        });
    }
    group.finish();
}

fn bench_blast(c: &mut Criterion) {
    let index = populated_history(30);
    let mut lag = LagCompensator::new(HISTORY);
    c.bench_function("blast_30_actors", |b| {
        b.iter(|| {
            black_box(lag.resolve_blast(
                &index,
                &attacker(),
                Vec3::new(0.0, 1.0, 14.0),
                7.5,
                (25.0, 150.0),
                1.0,
                Tick(HISTORY - 1),
                classify,
            ))
        });
    });
}

/// Ten participants holding the trigger: one full decision step each iteration.
fn bench_full_step(c: &mut Criterion) {
    let mut sim = Simulation::new(SimConfig::default(), Peer::authority(0)).unwrap_or_else(|e| panic!("{e}"));
    for i in 0..10u64 {
        let participant = ParticipantId(i);
        let _ = sim.join(participant, format!("bench-{i}"));
        if i % 2 == 1 {
            sim.session_mut()
                .switch_character(participant, Character::Nadja, Tick(0));
        }
    }
    while sim.tick().0 < 61 {
        black_box(sim.step());
    }

    c.bench_function("decision_step_10_participants", |b| {
        b.iter(|| {
            let now = sim.tick().0;
            for i in 0..10u64 {
                let mut input = TickInput::idle(now).with_buttons(&[Button::PrimaryAttack]);
                input.aim_point = Vec3::new(0.0, 1.0, if i % 2 == 0 { -20.0 } else { 20.0 });
                let _ = sim.submit_input(ParticipantId(i), input);
            }
            black_box(sim.step())
        });
    });
}

criterion_group!(benches, bench_hitscan, bench_blast, bench_full_step);
criterion_main!(benches);
