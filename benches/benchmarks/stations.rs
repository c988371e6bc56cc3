use std::sync::Arc;

use criterion::{black_box, criterion_group, Criterion};
use orbital_ring::{FlareModel, HubCatalog, RingConfig, RingSpace};

fn flare_profile(c: &mut Criterion) {
    let space = RingSpace::default();
    let catalog = Arc::new(HubCatalog::pillars(&space).unwrap());
    let model = FlareModel::from_config(&RingConfig::default(), catalog).unwrap();

    // Every 100 m through the Kongo flare, plateau and taper included
    let positions: Vec<f64> = (-300..=300).map(|i| i as f64 * 100.0).collect();

    c.bench_function("flare_profile_12_pillars", |b| {
        b.iter(|| {
            for p in positions.iter() {
                let _ = model.profile_at(black_box(*p)).unwrap();
            }
        })
    });
}

criterion_group!(benches, flare_profile);
