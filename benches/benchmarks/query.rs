use criterion::{black_box, criterion_group, Criterion};
use orbital_ring::query::PlacedEntity;
use orbital_ring::{chunks_in_range, entities_near, ChunkWindow, Floor, RingSpace};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn ranges(c: &mut Criterion) {
    let space = RingSpace::default();

    c.bench_function("chunks_in_range_across_seam", |b| {
        b.iter(|| {
            let range =
                chunks_in_range(&space, black_box(-500.0), black_box(25_000.0), Floor::PRIMARY)
                    .unwrap();
            range.iter().count()
        })
    });

    c.bench_function("window_diff_one_chunk_step", |b| {
        let before = ChunkWindow::from_range(
            &chunks_in_range(&space, 0.0, 25_000.0, Floor::PRIMARY).unwrap(),
        );
        let after = ChunkWindow::from_range(
            &chunks_in_range(&space, 1_000.0, 25_000.0, Floor::PRIMARY).unwrap(),
        );
        b.iter(|| ChunkWindow::diff(black_box(&before), black_box(&after)))
    });
}

fn entities(c: &mut Criterion) {
    let space = RingSpace::default();
    let mut rng = StdRng::seed_from_u64(11);
    let population: Vec<PlacedEntity> = (0..10_000)
        .map(|id| PlacedEntity {
            id,
            position: rng.gen_range(-200_000.0..200_000.0),
            floor: Floor(rng.gen_range(-2..=2)),
        })
        .collect();

    c.bench_function("entities_near_10k", |b| {
        b.iter(|| {
            entities_near(&space, black_box(0.0), 50_000.0, Floor::PRIMARY, &population)
                .unwrap()
                .len()
        })
    });
}

criterion_group!(benches, ranges, entities);
