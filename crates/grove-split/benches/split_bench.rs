//! Criterion benchmarks for grove-split: best-split search and contrast generation.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use grove_split::{BestSplitAllocs, Feature, FeatureMatrix, SplitCriterion, SplitterConfig};

/// `n_numeric` numeric features, one 20-category feature, and a 3-class target.
fn make_matrix(n_cases: usize, n_numeric: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut features: Vec<Feature> = (0..n_numeric)
        .map(|f| Feature::numeric(format!("N:f{f}")))
        .collect();
    features.push(Feature::categorical("C:cat"));
    features.push(Feature::categorical("C:y"));

    for i in 0..n_cases {
        let class = i % 3;
        for (f, feature) in features.iter_mut().take(n_numeric).enumerate() {
            let base = if f < 3 { class as f64 * 2.0 } else { 0.0 };
            feature.append(&format!("{}", base + rng.r#gen::<f64>()));
        }
        features[n_numeric].append(&format!("c{}", rng.gen_range(0..20)));
        features[n_numeric + 1].append(&class.to_string());
    }
    let labels = (0..n_cases).map(|i| i.to_string()).collect();
    FeatureMatrix::new(features, labels).unwrap()
}

fn bench_best_splitter(c: &mut Criterion) {
    let fm = make_matrix(2000, 20, 42);
    let target = fm.target("C:y", SplitCriterion::Gini).unwrap();
    let cases: Vec<usize> = (0..fm.n_cases()).collect();
    let candidates: Vec<usize> = (0..=20).collect();
    let config = SplitterConfig::default();
    let mut allocs = BestSplitAllocs::new(&target, 1);

    c.bench_function("best_splitter_2000x21", |b| {
        b.iter(|| {
            fm.best_splitter(&target, &cases, &candidates, &[], &config, &mut allocs)
                .unwrap()
        });
    });
}

fn bench_best_splitter_vetted(c: &mut Criterion) {
    let fm = make_matrix(2000, 20, 42);
    let target = fm.target("C:y", SplitCriterion::Gini).unwrap();
    let in_bag: Vec<usize> = (0..fm.n_cases()).filter(|c| c % 3 != 0).collect();
    let oob: Vec<usize> = (0..fm.n_cases()).filter(|c| c % 3 == 0).collect();
    let candidates: Vec<usize> = (0..=20).collect();
    let config = SplitterConfig::default().with_vet(true).with_eval_oob(true);
    let mut allocs = BestSplitAllocs::new(&target, 1);

    c.bench_function("best_splitter_vet_oob_2000x21", |b| {
        b.iter(|| {
            fm.best_splitter(&target, &in_bag, &candidates, &oob, &config, &mut allocs)
                .unwrap()
        });
    });
}

fn bench_contrast_all(c: &mut Criterion) {
    let fm = make_matrix(2000, 20, 42);

    c.bench_function("contrast_all_2000x22", |b| {
        b.iter(|| {
            let mut copy = fm.clone();
            copy.contrast_all(&mut ChaCha8Rng::seed_from_u64(7));
            copy
        });
    });
}

criterion_group!(
    benches,
    bench_best_splitter,
    bench_best_splitter_vetted,
    bench_contrast_all
);
criterion_main!(benches);
