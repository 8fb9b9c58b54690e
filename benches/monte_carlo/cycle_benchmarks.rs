use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mccycle::math::monte_carlo::{
    IntegrationAccumulator, IntegrationSession, RandomPointSampler, SessionConfig,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn bench_tally(c: &mut Criterion) {
    let mut group = c.benchmark_group("tally");
    let accumulator = IntegrationAccumulator::default();
    for &n in &[1_000u64, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut sampler = RandomPointSampler::unit(ChaCha20Rng::seed_from_u64(42));
            b.iter(|| black_box(accumulator.run_cycle(&mut sampler, n)))
        });
    }
    group.finish();
}

fn bench_session_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_cycle");
    group.bench_function("buffered_23458", |b| {
        b.iter_with_setup(
            || IntegrationSession::new(SessionConfig::default().with_seed(1)).unwrap(),
            |session| black_box(session.run_cycle(23_458)),
        )
    });
    group.bench_function("frozen_23458", |b| {
        let session = IntegrationSession::new(
            SessionConfig::default()
                .with_seed(1)
                .with_dense_point_threshold(0),
        )
        .unwrap();
        session.run_cycle(1).unwrap();
        b.iter(|| black_box(session.run_cycle(23_458)))
    });
    group.finish();
}

criterion_group!(benches, bench_tally, bench_session_cycle);
criterion_main!(benches);
