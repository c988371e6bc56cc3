use criterion::{black_box, criterion_group, Criterion};
use orbital_ring::RingSpace;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Positions spread over several laps in both directions
fn sample_positions(space: &RingSpace, n: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(7);
    let c = space.circumference();
    (0..n).map(|_| rng.gen_range(-3.0 * c..3.0 * c)).collect()
}

fn wrap_and_index(c: &mut Criterion) {
    let space = RingSpace::default();
    let positions = sample_positions(&space, 10_000);

    c.bench_function("position_to_chunk_index", |b| {
        b.iter(|| {
            for p in positions.iter() {
                let _ = space.position_to_chunk_index(black_box(*p)).unwrap();
            }
        })
    });

    c.bench_function("distance", |b| {
        b.iter(|| {
            for pair in positions.chunks_exact(2) {
                let _ = space.distance(black_box(pair[0]), black_box(pair[1])).unwrap();
            }
        })
    });
}

criterion_group!(benches, wrap_and_index);
