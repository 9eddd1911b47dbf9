//! History comparison benchmarks
//!
//! Measures store decoding and comparison over large metric histories.
//!
//! Toyota Way: Genchi Genbutsu (measure, don't guess)
//!
//! Run with: cargo bench --bench history_compare

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trueno_runner::compare::{HistoryComparator, ReportFormat};
use trueno_runner::config::{MetricKind, Split};
use trueno_runner::tracking::{decode_records, encode_records, MetricRecord, RunResult};

const SMALL_HISTORY: usize = 1_000;
const LARGE_HISTORY: usize = 100_000;

/// History alternating between four experiments and two backends
fn history(len: usize) -> Vec<MetricRecord> {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    (0..len)
        .map(|i| {
            let mut result = RunResult::new();
            for split in Split::ALL {
                for kind in MetricKind::STANDARD {
                    result.insert(split, kind.name(), (i % 97) as f64 / 10.0);
                }
            }
            MetricRecord::builder(
                format!("exp{}.yaml", i % 4),
                if i % 2 == 0 { "CPU" } else { "nervanagpu" },
            )
            .started_at(start + Duration::seconds(i as i64))
            .elapsed_secs(60.0)
            .result(result)
            .build()
        })
        .collect()
}

/// Benchmark selection and statistics over the history
fn bench_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_compare");

    for len in [SMALL_HISTORY, LARGE_HISTORY] {
        let records = history(len);
        let current = records[len - 1].clone();
        for match_backend in [false, true] {
            let comparator = HistoryComparator::new(10, match_backend);
            group.bench_with_input(
                BenchmarkId::new(format!("match_backend={match_backend}"), len),
                &records,
                |b, records| {
                    b.iter(|| comparator.compare(black_box(records), black_box(&current)));
                },
            );
        }
    }

    group.finish();
}

/// Benchmark rendering a full report
fn bench_render(c: &mut Criterion) {
    let records = history(SMALL_HISTORY);
    let current = records[SMALL_HISTORY - 1].clone();
    let report = HistoryComparator::default().compare(&records, &current);
    let format = ReportFormat {
        pad: true,
        ..ReportFormat::default()
    };

    c.bench_function("render_report", |b| {
        b.iter(|| format.render(black_box(&report)));
    });
}

/// Benchmark decoding the store file format
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_decode");

    for len in [SMALL_HISTORY, LARGE_HISTORY / 10] {
        let bytes = encode_records(&history(len), true).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_records", len), &bytes, |b, bytes| {
            b.iter(|| decode_records(black_box(bytes.as_slice())).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compare, bench_render, bench_decode);
criterion_main!(benches);
