use coil::reachability::{Reachability, Snapshot, flood_fill};
use coil::{Actor, Grid, Position};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Board with a vertical wall of body cells splitting it in two.
fn walled(size: usize) -> (Grid, Actor) {
    let mut grid = Grid::square(size).unwrap();
    let mid = size as i32 / 2;
    let actor = Actor::from_body((1..size as i32 - 1).map(|row| Position::new(row, mid)));
    grid.rebuild(&actor, None);
    (grid, actor)
}

/// Benchmark a raw flood fill on open and split boards of growing size
fn bench_flood_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("flood_fill");
    for size in [10, 20, 40] {
        let mut open = Grid::square(size).unwrap();
        let single = Actor::new(Position::new(1, 1));
        open.rebuild(&single, None);
        let snapshot = Snapshot::new(&open, single.clone(), 0);
        group.bench_with_input(BenchmarkId::new("open", size), &snapshot, |b, s| {
            b.iter(|| black_box(flood_fill(s, black_box(Position::new(1, 2)))))
        });

        let (grid, actor) = walled(size);
        let snapshot = Snapshot::new(&grid, actor, 0);
        group.bench_with_input(BenchmarkId::new("walled", size), &snapshot, |b, s| {
            b.iter(|| black_box(flood_fill(s, black_box(Position::new(1, 1)))))
        });
    }
    group.finish();
}

/// Benchmark repeated region lookups that hit the cache after the first fill
fn bench_cached_region(c: &mut Criterion) {
    let (grid, actor) = walled(20);
    let snapshot = Snapshot::new(&grid, actor, 0);
    let reach = Reachability::new();
    reach.region(&snapshot, Position::new(1, 1));

    c.bench_function("cached_region", |b| {
        b.iter(|| black_box(reach.area(&snapshot, black_box(Position::new(5, 2)))))
    });
}

criterion_group!(benches, bench_flood_fill, bench_cached_region);
criterion_main!(benches);
