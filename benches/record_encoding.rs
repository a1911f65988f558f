//! Benchmarks for reel record encoding
//!
//! The writer builds one length-prefixed record per frame on the hot
//! path, so encoding cost scales directly with capture frame rate.
//! Payload sizes cover the typical range of JPEG-encoded screencast
//! frames at common viewport sizes.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use kinescope::reel::ReelReader;
use kinescope::reel::format::encode_record;
use std::hint::black_box;

fn bench_record_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_encoding");

    for &size in &[16 * 1024usize, 64 * 1024, 256 * 1024] {
        let payload = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_{}k", size / 1024), |b| {
            b.iter(|| encode_record(black_box(&payload)));
        });
    }

    group.finish();
}

fn bench_reel_reading(c: &mut Criterion) {
    let frame = vec![0x5Au8; 64 * 1024];
    let reel: Vec<u8> = (0..64).flat_map(|_| encode_record(&frame)).collect();
    let reel_len = reel.len() as u64;

    let mut group = c.benchmark_group("reel_reading");
    group.throughput(Throughput::Bytes(reel_len));
    group.bench_function("read_64_records", |b| {
        b.iter(|| {
            let mut reader = ReelReader::from_bytes(black_box(reel.clone()));
            let mut records = 0u64;
            while reader.read_next_record().expect("well-formed reel").is_some() {
                records += 1;
            }
            records
        });
    });
    group.finish();
}

criterion_group!(benches, bench_record_encoding, bench_reel_reading);
criterion_main!(benches);
