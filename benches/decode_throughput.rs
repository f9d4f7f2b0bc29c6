//! Benchmarks for the capture hot path
//!
//! Covers what the receive loop does per datagram:
//! - ArtDmx decoding of full and partial payloads
//! - Rejection of foreign Art-Net traffic
//! - Appending into the shared frame store
//! - Comparing a captured frame against an expectation
//!
//! Platform: Cross-platform (no sockets, CI-safe)

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use lightcheck::artnet::{FrameComparator, FrameStore, decode, encode_art_dmx};
use lightcheck::test_utils::payload_with;
use lightcheck::DmxFrame;
use std::hint::black_box;

fn bench_decode(c: &mut Criterion) {
    let full = encode_art_dmx(0, 1, &payload_with(&[(1, 177), (512, 255)]));
    let partial = encode_art_dmx(0, 1, &[255; 24]);

    let mut group = c.benchmark_group("artdmx_decode");

    group.throughput(Throughput::Bytes(full.len() as u64));
    group.bench_function("full_universe", |b| b.iter(|| black_box(decode(black_box(&full)))));

    group.throughput(Throughput::Bytes(partial.len() as u64));
    group.bench_function("24_channels", |b| b.iter(|| black_box(decode(black_box(&partial)))));

    group.finish();
}

fn bench_reject(c: &mut Criterion) {
    let mut poll = encode_art_dmx(0, 0, &[]);
    poll[8..10].copy_from_slice(&0x2000u16.to_le_bytes());
    let noise = vec![0xA5u8; 530];

    c.bench_function("reject_art_poll", |b| b.iter(|| black_box(decode(black_box(&poll)))));
    c.bench_function("reject_noise", |b| b.iter(|| black_box(decode(black_box(&noise)))));
}

fn bench_store_append(c: &mut Criterion) {
    let frame = decode(&encode_art_dmx(0, 1, &payload_with(&[(1, 177)]))).expect("valid ArtDmx");

    // A 40Hz server fills about 2400 frames per universe per minute
    c.bench_function("store_append_2400", |b| {
        b.iter_batched(
            FrameStore::new,
            |store| {
                for _ in 0..2400 {
                    store.append(frame.clone());
                }
                black_box(store.len())
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_compare(c: &mut Criterion) {
    let captured = decode(&encode_art_dmx(0, 1, &payload_with(&[(1, 177), (10, 53)]))).expect("valid ArtDmx");
    let expected = DmxFrame::expected(0, [(1, 175), (10, 50)]);
    let comparator = FrameComparator::new(2);

    c.bench_function("compare_full_universe", |b| {
        b.iter(|| black_box(comparator.compare(Some(black_box(&captured)), Some(black_box(&expected)))))
    });
}

criterion_group!(benches, bench_decode, bench_reject, bench_store_append, bench_compare);
criterion_main!(benches);
