//! Benchmarks for dictionary matching.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use semix::kb::Triples;
use semix::matcher::Matcher;
use semix::resource::Resource;
use semix::text::normalize;
use semix::traits::{Trait, Traits};

const SYLLABLES: &[&str] = &["ka", "lo", "mi", "ne", "ru", "sa", "ti", "vo", "ze", "po"];

fn word(rng: &mut impl Rng) -> String {
    let n = rng.gen_range(2..5);
    (0..n).filter_map(|_| SYLLABLES.choose(rng).copied()).collect()
}

/// A resource of 2000 concepts with one or two word labels, and a text of
/// 5000 words drawn from the same vocabulary.
fn fixture() -> (Resource, String) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut triples = Triples::new();
    for i in 0..2000 {
        let label = if i % 3 == 0 {
            format!("{} {}", word(&mut rng), word(&mut rng))
        } else {
            word(&mut rng)
        };
        triples = triples.add(&format!("http://bench/{i}"), "label", &label);
    }
    let traits = Traits::new().with(Trait::Distinct, ["label"]);
    let resource = Resource::build(&mut triples, &traits).unwrap();
    let words: Vec<String> = (0..5000).map(|_| word(&mut rng)).collect();
    (resource, normalize(&words.join(" "), true))
}

/// Scan the whole buffer the way the match stage does.
fn scan(matcher: &Matcher, text: &str) -> usize {
    let mut rest = text.as_bytes();
    let mut hits = 0;
    while let Some(pos) = matcher.find(rest) {
        hits += 1;
        // keep the space before the next word
        rest = &rest[pos.end..];
    }
    hits
}

fn bench_normalize(c: &mut Criterion) {
    let (_, text) = fixture();
    let raw = text.replace(' ', ",  ").to_uppercase();
    c.bench_function("normalize_5k_words", |bench| {
        bench.iter(|| black_box(normalize(&raw, true)))
    });
}

fn bench_exact(c: &mut Criterion) {
    let (resource, text) = fixture();
    let matcher = Matcher::Exact(resource.dfa());
    c.bench_function("exact_5k_words", |bench| {
        bench.iter(|| black_box(scan(&matcher, &text)))
    });
}

fn bench_fuzzy(c: &mut Criterion) {
    let (resource, text) = fixture();
    let text: String = text.chars().take(4000).collect();
    for k in [1u8, 2] {
        let matcher = Matcher::Fuzzy { dfa: resource.dfa(), k };
        c.bench_function(&format!("fuzzy_k{k}_4kb"), |bench| {
            bench.iter(|| black_box(scan(&matcher, &text)))
        });
    }
}

criterion_group!(benches, bench_normalize, bench_exact, bench_fuzzy);
criterion_main!(benches);
