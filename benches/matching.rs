use criterion::{black_box, criterion_group, criterion_main, Criterion};

use molquery::SessionPool;

const CAFFEINE: &str = "Cn1cnc2c1c(=O)n(C)c(=O)n2C";
const NAPHTHALENE: &str = "c1ccc2ccccc2c1";

fn bench_count_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_matches");

    group.bench_function("aromatic_carbon_in_caffeine", |b| {
        let mut pool = SessionPool::new();
        let id = pool.open_session();
        let session = pool.session_mut(id).unwrap();
        let target = session.molecule_from_smiles(CAFFEINE).unwrap();
        let query = session.pattern_from_smiles("c").unwrap();
        let matcher = session.create_matcher(target, "").unwrap();
        b.iter(|| black_box(session.count_matches(matcher, query, 0).unwrap()));
    });

    group.bench_function("ring_pair_in_naphthalene", |b| {
        let mut pool = SessionPool::new();
        let id = pool.open_session();
        let session = pool.session_mut(id).unwrap();
        let target = session.molecule_from_smiles(NAPHTHALENE).unwrap();
        let query = session.pattern_from_smiles("cc").unwrap();
        let matcher = session.create_matcher(target, "").unwrap();
        b.iter(|| black_box(session.count_matches(matcher, query, 0).unwrap()));
    });

    group.finish();
}

fn bench_match_once(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_once");

    group.bench_function("carbonyl_in_caffeine", |b| {
        let mut pool = SessionPool::new();
        let id = pool.open_session();
        let session = pool.session_mut(id).unwrap();
        let target = session.molecule_from_smiles(CAFFEINE).unwrap();
        let query = session.pattern_from_smiles("C=O").unwrap();
        let matcher = session.create_matcher(target, "").unwrap();
        b.iter(|| black_box(session.match_once(matcher, query).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_count_matches, bench_match_once);
criterion_main!(benches);
