use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mela_jack::{estimate, sample_columns};

fn synthetic(ncfg: usize, nt: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(ncfg * nt);
    for cfg in 0..ncfg {
        let jitter = 1.0 + 0.01 * ((cfg * 7919) % 101) as f64 / 101.0;
        for t in 0..nt {
            data.push(jitter * (-0.45 * t as f64).exp());
        }
    }
    data
}

fn bench_jackknife(c: &mut Criterion) {
    let ncfg = 1000;
    let nt = 64;
    let data = synthetic(ncfg, nt);
    c.bench_function("sample_columns_1000x64_bin10", |b| {
        b.iter(|| {
            let bins = sample_columns(black_box(&data), ncfg, nt, 10).expect("bins");
            black_box(estimate(&bins, bins.nbins(), nt).expect("mean"))
        })
    });
}

criterion_group!(benches, bench_jackknife);
criterion_main!(benches);
