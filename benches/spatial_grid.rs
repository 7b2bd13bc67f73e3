use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use bevy_ecs::prelude::*;
use skirmish_sim::*;

fn spawn_field(sim: &mut SimWorld, count: usize) {
    for i in 0..count {
        let angle = i as f32 * 0.37;
        sim.world_mut().spawn(MobileBundle::moving(
            (i % 100) as f32 * 12.0,
            (i / 100) as f32 * 12.0,
            angle.cos() * 30.0,
            angle.sin() * 30.0,
        ));
    }
}

fn bench_grid_queries(c: &mut Criterion) {
    let mut grid = SpatialHashGrid::default();
    let mut world = World::new();
    for i in 0..10_000u32 {
        let e = world.spawn_empty().id();
        grid.insert(e, (i % 100) as f32 * 10.0, (i / 100) as f32 * 10.0);
    }

    c.bench_function("grid_get_nearby_10k", |b| {
        b.iter(|| grid.get_nearby(black_box(500.0), black_box(500.0)))
    });
}

fn bench_tick(c: &mut Criterion) {
    c.bench_function("tick_movement_sync_5k", |b| {
        b.iter_batched(
            || {
                let mut sim = SimWorld::new();
                spawn_field(&mut sim, 5_000);
                sim
            },
            |mut sim| {
                for _ in 0..10 {
                    let _ = sim.tick(black_box(0.05));
                }
                sim
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, bench_grid_queries, bench_tick);
criterion_main!(benches);
