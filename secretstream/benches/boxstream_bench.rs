//! Box-stream benchmarks using criterion.
//!
//! Measures:
//!   - Frame sealing / opening at various chunk sizes
//!   - Async throughput of BoxWriter -> BoxReader over an in-memory pipe

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use secretstream::boxstream::{BoxReader, BoxWriter, FrameHeader, FrameOpener, FrameSealer};
use secretstream::HEADER_LENGTH;

const KEY: [u8; 32] = [0x5A; 32];
const NONCE: [u8; 24] = [0x01; 24];

// ---------------------------------------------------------------------------
// Frame codec
// ---------------------------------------------------------------------------

fn bench_seal_open(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_codec");
    for size in [64usize, 1024, 4096] {
        let chunk = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("seal", size), &chunk, |b, chunk| {
            let mut sealer = FrameSealer::new(&KEY, NONCE);
            let mut out = BytesMut::with_capacity(HEADER_LENGTH + size);
            b.iter(|| {
                out.clear();
                sealer.seal_into(black_box(chunk), &mut out).unwrap();
            });
        });

        group.bench_with_input(BenchmarkId::new("seal_open", size), &chunk, |b, chunk| {
            b.iter(|| {
                let mut sealer = FrameSealer::new(&KEY, NONCE);
                let mut opener = FrameOpener::new(&KEY, NONCE);
                let mut out = BytesMut::new();
                sealer.seal_into(chunk, &mut out).unwrap();
                let header: [u8; HEADER_LENGTH] = out[..HEADER_LENGTH].try_into().unwrap();
                if let FrameHeader::Body { len, tag } = opener.open_header(&header).unwrap() {
                    opener
                        .open_body(&mut out[HEADER_LENGTH..HEADER_LENGTH + len], &tag)
                        .unwrap();
                }
                black_box(out);
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Async throughput
// ---------------------------------------------------------------------------

fn bench_stream_throughput(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let payload = vec![0x42u8; 1024 * 1024];

    let mut group = c.benchmark_group("box_stream");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("transfer_1mib", |b| {
        b.to_async(&rt).iter(|| {
            let payload = payload.clone();
            async move {
                let (a, bside) = tokio::io::duplex(64 * 1024);
                let writer = tokio::spawn(async move {
                    let mut w = BoxWriter::new(a, &KEY, NONCE);
                    w.write_all(&payload).await.unwrap();
                    w.shutdown().await.unwrap();
                });
                let mut r = BoxReader::new(bside, &KEY, NONCE);
                let mut out = Vec::with_capacity(1024 * 1024);
                r.read_to_end(&mut out).await.unwrap();
                writer.await.unwrap();
                black_box(out);
            }
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group! {
    name = boxstream_benches;
    config = Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_seal_open,
        bench_stream_throughput
}

criterion_main!(boxstream_benches);
