use criterion::{black_box, criterion_group, criterion_main, Criterion};
use autocrc::checksum::{checksum_bytes, compute};
use autocrc::{Config, RunOptions, TargetResolver};
use std::io::Cursor;

fn bench_crc(c: &mut Criterion) {
    let data = vec![0xA5u8; 1024 * 1024];

    c.bench_function("crc32_slice_1mb", |b| b.iter(|| checksum_bytes(black_box(&data))));
    c.bench_function("crc32_stream_1mb", |b| {
        b.iter(|| compute(Cursor::new(black_box(&data))).unwrap())
    });
}

fn bench_directory_run(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    for i in 0..32 {
        let data = vec![i as u8; 64 * 1024];
        let name = format!("file{i:02}[{}].bin", checksum_bytes(&data));
        std::fs::write(dir.path().join(name), &data).unwrap();
    }

    c.bench_function("verify_dir_32x64k", |b| {
        b.iter(|| {
            let targets = TargetResolver::new(Config::with_paths([dir.path()])).unwrap();
            let summary = autocrc::run(targets, &RunOptions::default(), |_| {});
            assert!(summary.is_ok());
        })
    });
}

criterion_group!(benches, bench_crc, bench_directory_run);
criterion_main!(benches);
