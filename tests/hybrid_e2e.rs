//! End-to-end tests of the hybrid index: plan selection, filtered result
//! exactness on the scan path, and the empirical behaviour of the
//! probabilistic path.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use metaxy::{BruteForceBackend, HybridIndex};

/// 100 random 4-D vectors with s ~ U(0, 10), seeded.
fn small_uniform_dataset(seed: u64) -> Vec<(Vec<f32>, f32)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..100)
        .map(|_| {
            let v: Vec<f32> = (0..4).map(|_| rng.random_range(-1.0..1.0)).collect();
            let s: f32 = rng.random_range(0.0..10.0);
            (v, s)
        })
        .collect()
}

fn build_index(records: &[(Vec<f32>, f32)]) -> HybridIndex {
    let mut index = HybridIndex::new(16).unwrap();
    for (v, s) in records {
        index.insert(v, *s).unwrap();
    }
    index
}

/// Exact answer by linear scan: ids in `[smin, smax]` closest to `v`.
fn exact_filtered_knn(
    records: &[(Vec<f32>, f32)],
    v: &[f32],
    k: usize,
    smin: f32,
    smax: f32,
) -> Vec<u32> {
    let mut scored: Vec<(f32, u32)> = records
        .iter()
        .enumerate()
        .filter(|(_, (_, s))| *s >= smin && *s <= smax)
        .map(|(i, (vec, _))| {
            let d: f32 = v
                .iter()
                .zip(vec.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (d, i as u32)
        })
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    scored.truncate(k);
    scored.into_iter().map(|(_, id)| id).collect()
}

#[test]
fn empty_scalar_range_returns_nothing() {
    let records = small_uniform_dataset(11);
    let mut index = build_index(&records);
    // s is drawn from [0, 10); nothing can fall in [50, 60].
    let hits = index.query_prob(&[0.0; 4], 5, 50.0, 60.0, 0.01).unwrap();
    assert!(hits.is_empty());
    assert_eq!(index.count_in_range(50.0, 60.0), 0);
}

#[test]
fn narrow_filter_takes_the_scan_plan_and_is_exact() {
    let records = small_uniform_dataset(12);
    let mut index = build_index(&records);
    let query = [0.25, -0.5, 0.1, 0.9];

    // S is around 10 here, far below the candidate budget of 1000, so the
    // planner enumerates the range and the answer must be exact.
    let hits = index.query_fixed(&query, 5, 0.0, 1.0, 1000).unwrap();
    let expected = exact_filtered_knn(&records, &query, 5, 0.0, 1.0);
    assert_eq!(hits, expected);
}

#[test]
fn scan_plan_handles_fewer_matches_than_k() {
    let mut index = HybridIndex::new(16).unwrap();
    for i in 0..20u32 {
        index.insert(&[i as f32, 0.0], i as f32).unwrap();
    }
    // Only 3 records in range but 10 requested: short result, not an error.
    let hits = index.query_fixed(&[0.0, 0.0], 10, 5.0, 7.0, 100).unwrap();
    assert_eq!(hits, vec![5, 6, 7]);
}

#[test]
fn wide_filter_takes_the_ann_plan() {
    let records = small_uniform_dataset(13);
    let mut index = build_index(&records);
    let query = [0.0, 0.0, 0.0, 0.0];

    // Everything passes the filter (S = 100 >= O = 10): ANN path. With
    // every candidate in range the result is the plain top-k.
    let hits = index.query_fixed(&query, 5, -100.0, 100.0, 10).unwrap();
    assert_eq!(hits.len(), 5);
    let expected = exact_filtered_knn(&records, &query, 5, -100.0, 100.0);
    // The graph is approximate; demand substantial overlap rather than
    // equality, and exact ordering of whatever was returned.
    let overlap = hits.iter().filter(|id| expected.contains(id)).count();
    assert!(overlap >= 3, "top-5 overlap {overlap} too low");
}

#[test]
fn probabilistic_path_returns_k_when_enough_pass() {
    let records = small_uniform_dataset(14);
    let mut index = build_index(&records);

    // About half the records pass; the sized budget plus margin covers the
    // whole dataset, so k results must come back.
    let hits = index.query_prob(&[0.1; 4], 5, 0.0, 5.0, 0.01).unwrap();
    assert_eq!(hits.len(), 5);
    for &id in &hits {
        let s = records[id as usize].1;
        assert!((0.0..=5.0).contains(&s), "id {id} has s = {s} out of range");
    }
}

#[test]
fn results_are_sorted_by_distance_then_id() {
    let mut index = HybridIndex::new(16).unwrap();
    // Four records equidistant from the origin query, distinct scalars in
    // range: ties must resolve by ascending id.
    index.insert(&[1.0, 0.0], 1.0).unwrap();
    index.insert(&[0.0, 1.0], 2.0).unwrap();
    index.insert(&[-1.0, 0.0], 3.0).unwrap();
    index.insert(&[0.0, -1.0], 4.0).unwrap();

    let hits = index.query_fixed(&[0.0, 0.0], 4, 0.0, 10.0, 1000).unwrap();
    assert_eq!(hits, vec![0, 1, 2, 3]);
}

/// Empirical check of the confidence contract: across repeated runs on
/// fresh seeded data, the frequency of returning fewer than k matches
/// stays within alpha plus binomial confidence slack. The exhaustive
/// backend pins candidate retrieval to the model the sizing maths assumes.
#[test]
fn short_result_rate_respects_alpha() {
    const RUNS: u64 = 50;
    const K: usize = 5;
    const ALPHA: f64 = 0.05;

    let mut short_results = 0;
    for seed in 0..RUNS {
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        let mut index =
            HybridIndex::with_backend(16, 200, |dim| BruteForceBackend::new(dim)).unwrap();

        // 2000 records, scalars uniform on [0, 10): the range [0, 1)
        // passes roughly 10% of them.
        for _ in 0..2000 {
            let v: Vec<f32> = (0..4).map(|_| rng.random_range(-1.0..1.0)).collect();
            let s: f32 = rng.random_range(0.0..10.0);
            index.insert(&v, s).unwrap();
        }

        let query: Vec<f32> = (0..4).map(|_| rng.random_range(-1.0..1.0)).collect();
        let hits = index.query_prob(&query, K, 0.0, 1.0, ALPHA).unwrap();
        if hits.len() < K {
            short_results += 1;
        }
    }

    // alpha * N plus ~3 standard deviations of slack.
    let bound = (ALPHA * RUNS as f64 + 3.0 * (RUNS as f64 * ALPHA * (1.0 - ALPHA)).sqrt()).ceil();
    assert!(
        (short_results as f64) <= bound,
        "{short_results} short results out of {RUNS} exceeds bound {bound}"
    );
}

#[test]
fn brute_force_backend_is_a_drop_in() {
    let records = small_uniform_dataset(15);
    let mut index =
        HybridIndex::with_backend(16, 200, |dim| BruteForceBackend::new(dim)).unwrap();
    for (v, s) in &records {
        index.insert(v, *s).unwrap();
    }

    // With an exact backend and a budget covering the whole dataset, the
    // ANN path must match the linear-scan answer bit for bit.
    let query = [0.3, 0.3, -0.3, 0.0];
    let hits = index.query_fixed(&query, 7, 2.0, 8.0, 100).unwrap();
    let expected = exact_filtered_knn(&records, &query, 7, 2.0, 8.0);
    assert_eq!(hits, expected);
}

mod dataset_io {
    use std::io::Write;

    use metaxy::dataset;
    use metaxy::HybridIndex;

    #[test]
    fn ingest_and_query_from_files() {
        let mut records_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(records_file, "x0,x1,s").unwrap();
        for i in 0..10 {
            writeln!(records_file, "{}.0,0.5,{}.0", i, i).unwrap();
        }
        records_file.flush().unwrap();

        let mut queries_file = tempfile::NamedTempFile::new().unwrap();
        writeln!(queries_file, "x0,x1,k,smin,smax,o").unwrap();
        writeln!(queries_file, "3.1,0.5,2,2.0,8.0,1000").unwrap();
        queries_file.flush().unwrap();

        let records = dataset::read_records(std::io::BufReader::new(
            std::fs::File::open(records_file.path()).unwrap(),
        ))
        .unwrap();
        let queries = dataset::read_queries(std::io::BufReader::new(
            std::fs::File::open(queries_file.path()).unwrap(),
        ))
        .unwrap();

        let mut index = HybridIndex::new(8).unwrap();
        for (v, s) in &records {
            index.insert(v, *s).unwrap();
        }

        let q = &queries[0];
        let hits = index
            .query_fixed(&q.vector, q.k, q.smin, q.smax, q.candidates)
            .unwrap();
        // Records 2..=8 pass the filter; nearest to x0 = 3.1 are ids 3, 4.
        assert_eq!(hits, vec![3, 4]);
    }
}
