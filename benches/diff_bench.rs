//! Criterion benches for unified diff synthesis.
//!
//! Covers:
//! - sparse edits in files of growing length (hunk grouping dominates)
//! - files made mostly of blank lines (popular-line handling)

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use pair_import::diff::unified_diff;

fn source_file(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("    let value_{i} = compute({i}, \"field_{}\");\n", i % 17))
        .collect()
}

fn sparse_edit(text: &str, every: usize) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            if i % every == 0 {
                format!("{line} // edited\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect()
}

fn bench_sparse_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/sparse_edits");
    for lines in [100usize, 1_000, 5_000] {
        let before = source_file(lines);
        let after = sparse_edit(&before, 50);
        group.throughput(Throughput::Bytes((before.len() + after.len()) as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), &lines, |b, _| {
            b.iter(|| {
                let diff = unified_diff("before.rs", "after.rs", &before, &after)
                    .expect("diff should succeed");
                assert!(!diff.is_empty());
            });
        });
    }
    group.finish();
}

fn bench_blank_heavy(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/blank_heavy");
    for lines in [500usize, 2_000] {
        let before: String = (0..lines)
            .map(|i| if i % 10 == 0 { format!("section {i}\n") } else { "\n".to_owned() })
            .collect();
        let after = before.replacen("section 0\n", "section zero\n", 1);
        group.bench_with_input(BenchmarkId::new("lines", lines), &lines, |b, _| {
            b.iter(|| {
                unified_diff("before.txt", "after.txt", &before, &after)
                    .expect("diff should succeed")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sparse_edits, bench_blank_heavy);
criterion_main!(benches);
