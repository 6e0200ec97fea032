use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

use hexfront::board::sight::sight_blocked;
use hexfront::board::{Battle, HexCoord, Side, UnitCatalog};
use hexfront::config::BattleConfig;
use hexfront::decision::{PerSide, Policy};
use hexfront::resolve::{assemble, resolve, AttackFlags, Roll2d6};

fn standard_battle(seed: u64) -> Battle {
    let catalog = UnitCatalog::builtin().unwrap();
    let config = BattleConfig {
        seed: Some(seed),
        ..BattleConfig::default()
    };
    Battle::standard(&catalog, config).unwrap()
}

fn bench_path_across_map(c: &mut Criterion) {
    let battle = standard_battle(1);
    let knights = battle.unit_at(HexCoord::new(4, 2)).unwrap().id;
    c.bench_function("path_knights_to_far_flank", |b| {
        b.iter(|| battle.path_for(black_box(knights), black_box(HexCoord::new(11, 9))))
    });
}

fn bench_sight_lines(c: &mut Criterion) {
    let battle = standard_battle(2);
    let from = HexCoord::new(5, 2);
    let targets: Vec<HexCoord> = battle
        .units()
        .iter()
        .filter(|u| u.side == Side::Second)
        .map(|u| u.hex)
        .collect();
    c.bench_function("sight_lines_to_enemy_force", |b| {
        b.iter(|| {
            targets
                .iter()
                .filter(|&&t| sight_blocked(battle.map(), black_box(from), t))
                .count()
        })
    });
}

fn bench_resolve(c: &mut Criterion) {
    let battle = standard_battle(3);
    let attacker = battle.unit_at(HexCoord::new(5, 3)).unwrap();
    let defender = battle.unit_at(HexCoord::new(5, 8)).unwrap();
    let rolls: Vec<(Roll2d6, Roll2d6)> = (1..=6u8)
        .flat_map(|a| (1..=6u8).map(move |d| (Roll2d6(a, d), Roll2d6(d, a))))
        .collect();
    c.bench_function("assemble_and_resolve_36_rolls", |b| {
        b.iter(|| {
            let e = assemble(black_box(attacker), black_box(defender), AttackFlags::default());
            rolls.iter().map(|&(a, d)| resolve(&e, a, d).hits()).sum::<i32>()
        })
    });
}

fn bench_ai_side_turn(c: &mut Criterion) {
    let battle = standard_battle(4);
    let mut group = c.benchmark_group("ai");
    group.measurement_time(Duration::from_secs(10));
    group.bench_function("ai_first_side_turn", |b| {
        b.iter_batched(
            || battle.clone(),
            |mut battle| {
                let mut decider = PerSide([Policy::Ai, Policy::Ai]);
                battle.run_side_turn(&mut decider).unwrap();
                battle
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_path_across_map,
    bench_sight_lines,
    bench_resolve,
    bench_ai_side_turn,
);
criterion_main!(benches);
