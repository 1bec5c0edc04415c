//! Benchmarks for the stream blocks
//!
//! Run with: cargo bench -p streamblocks-core --bench blocks_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use streamblocks_core::depuncture::{depuncture_soft, flags_to_pattern};
use streamblocks_core::prelude::*;

const WINDOW: usize = 4096;

fn llr_stream(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| if i % 3 == 0 { -0.8 } else { 1.2 })
        .collect()
}

fn envelope(n: usize) -> Vec<Sample> {
    // Periodic pulses over a low noise floor.
    (0..n)
        .map(|i| {
            let phase = (i % 64) as Sample;
            let pulse = (-((phase - 32.0) / 4.0).powi(2)).exp() * 10.0;
            pulse + 0.1 * ((i * 7919) % 13) as Sample / 13.0
        })
        .collect()
}

// ============================================================================
// Depuncturer Benchmarks
// ============================================================================

fn bench_depuncture(c: &mut Criterion) {
    let mut group = c.benchmark_group("depuncture");

    for rate in [
        PuncturePattern::Rate1_2,
        PuncturePattern::Rate2_3,
        PuncturePattern::Rate3_4,
        PuncturePattern::Rate7_8,
    ] {
        let dp = Depuncturer::new(rate.flags()).unwrap();
        let needed = dp.forecast(WINDOW);
        let input = llr_stream(needed);
        let mut output = vec![0.0; WINDOW];

        group.throughput(Throughput::Elements(WINDOW as u64));
        group.bench_with_input(BenchmarkId::new("work", format!("{rate:?}")), &rate, |b, _| {
            b.iter(|| dp.work(black_box(&input), black_box(&mut output)))
        });
    }

    let pattern = flags_to_pattern(PuncturePattern::Rate3_4.flags());
    let llrs = llr_stream(WINDOW);
    group.bench_function("depuncture_soft", |b| {
        b.iter(|| depuncture_soft(black_box(&llrs), &pattern, 0.0))
    });

    group.finish();
}

// ============================================================================
// Peak Detector Benchmarks
// ============================================================================

fn bench_peak_detector(c: &mut Criterion) {
    let mut group = c.benchmark_group("peak_detector");
    let stream = envelope(WINDOW + 1);

    for (name, config) in [
        ("raw", PeakDetectorConfig::default()),
        (
            "smoothed",
            PeakDetectorConfig {
                min_len: 3,
                lockout: 16,
                alpha: 0.2,
                look_ahead: 4,
                ..Default::default()
            },
        ),
    ] {
        group.throughput(Throughput::Elements(WINDOW as u64));
        group.bench_function(name, |b| {
            let mut output = vec![0.0; WINDOW];
            b.iter(|| {
                let pd = PeakDetector::new(config).unwrap();
                pd.work(black_box(&stream), &mut output).unwrap()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Time Keeper Benchmarks
// ============================================================================

fn bench_time_keeper(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_keeper");

    for tags_per_window in [0u64, 1, 16] {
        let mut tags = TagStore::new();
        if tags_per_window > 0 {
            let spacing = WINDOW as u64 / tags_per_window;
            for i in 0..tags_per_window * 64 {
                tags.add_time(0, i * spacing, TimeSpec::new(i, 0.5));
            }
        }

        group.bench_with_input(
            BenchmarkId::new("work", tags_per_window),
            &tags,
            |b, tags| {
                b.iter(|| {
                    let tk = TimeKeeper::new(8, 1e6).unwrap();
                    for _ in 0..64 {
                        tk.work(WINDOW, tags);
                    }
                    black_box(tk.current_time(true))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_depuncture, bench_peak_detector, bench_time_keeper);
criterion_main!(benches);
