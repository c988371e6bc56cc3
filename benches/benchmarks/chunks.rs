use std::sync::Arc;

use criterion::{black_box, criterion_group, Criterion};
use orbital_ring::{
    chunks_in_range, ChunkGeometryStore, Floor, HubCatalog, RingConfig, RingSpace,
};

fn pillar_store() -> ChunkGeometryStore {
    let space = RingSpace::default();
    let catalog = Arc::new(HubCatalog::pillars(&space).unwrap());
    ChunkGeometryStore::new(RingConfig::default(), catalog).unwrap()
}

fn cache_hits(c: &mut Criterion) {
    let store = pillar_store();
    let range = chunks_in_range(store.space(), 0.0, 50_000.0, Floor::PRIMARY).unwrap();
    store.generate(&range).unwrap();

    c.bench_function("width_at_cached", |b| {
        b.iter(|| {
            for i in -50..=50 {
                let _ = store
                    .width_at(black_box(i), Floor::PRIMARY, black_box(250.0))
                    .unwrap();
            }
        })
    });
}

fn generation(c: &mut Criterion) {
    let space = RingSpace::default();
    let range = chunks_in_range(&space, 0.0, 100_000.0, Floor::PRIMARY).unwrap();

    c.bench_function("generate_200km_cold", |b| {
        b.iter_with_setup(pillar_store, |store| {
            let _ = store.generate(black_box(&range)).unwrap();
        })
    });
}

criterion_group!(benches, cache_hits, generation);
