use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mzaccess::codec;
use mzaccess::prelude::*;

/// Profile-like rows: every third spectrum is MS1, signal in short runs separated by zeros
fn create_run(num_spectra: usize, points_per_spectrum: usize) -> SpectrumListPtr {
    let rows = (0..num_spectra)
        .map(|i| {
            let ms_level = if i % 3 == 0 { 1 } else { 2 };
            let mz: Vec<f64> = (0..points_per_spectrum).map(|j| 200.0 + j as f64 * 0.01).collect();
            let intensity: Vec<f64> = (0..points_per_spectrum)
                .map(|j| if j % 10 < 3 { 1000.0 + j as f64 } else { 0.0 })
                .collect();
            let mut row = MemoryRow::spectrum(i as i64 + 1, ms_level, i as f64 * 0.5, mz, intensity);
            if ms_level == 2 {
                row = row.with_precursor(Precursor::at_mz(500.0 + (i % 100) as f64));
            }
            row
        })
        .collect();
    Arc::new(SourceSpectrumList::new(
        share(MemorySource::new(rows)),
        ListConfig::default(),
    ))
}

/// Benchmark building the index of an MS level filter
fn bench_ms_level_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("ms_level_filter");

    for num_spectra in [1000, 10_000, 50_000] {
        group.throughput(Throughput::Elements(num_spectra as u64));
        let run = create_run(num_spectra, 10);
        run.size().unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}spectra", num_spectra)),
            &num_spectra,
            |b, _| {
                b.iter(|| {
                    let ms2 = FilterFactory::wrap(Arc::clone(&run), black_box("msLevel 2")).unwrap();
                    black_box(ms2.size().unwrap());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark a chain that needs full metadata to decide
fn bench_precursor_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("precursor_chain");
    let run = create_run(10_000, 10);
    run.size().unwrap();

    group.bench_function("msLevel+mzPrecursors", |b| {
        b.iter(|| {
            let chain = FilterFactory::wrap_all(
                Arc::clone(&run),
                ["msLevel 2", "mzPrecursors [510,520,530] mzTol=0.5mz"],
            )
            .unwrap();
            black_box(chain.size().unwrap());
        });
    });

    group.finish();
}

/// Benchmark zero-sample compaction of profile arrays
fn bench_compaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("compaction");

    for points in [1_000, 100_000] {
        let mz: Vec<f64> = (0..points).map(|j| 200.0 + j as f64 * 0.01).collect();
        let intensity: Vec<f64> = (0..points)
            .map(|j| if j % 10 < 3 { 1.0 } else { 0.0 })
            .collect();
        group.throughput(Throughput::Elements(points as u64));

        group.bench_with_input(BenchmarkId::from_parameter(points), &points, |b, _| {
            b.iter(|| {
                let mut coords = mz.clone();
                let mut values = intensity.clone();
                codec::compact_in_place(&mut coords, &mut values);
                black_box(coords.len());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ms_level_filter, bench_precursor_chain, bench_compaction);
criterion_main!(benches);
