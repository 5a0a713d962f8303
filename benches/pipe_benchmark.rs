/*!
 * Pipe Benchmarks
 *
 * Single-threaded write/read cost and cross-thread wake latency
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::thread;
use syncpipe::{CircularBuffer, PipeConfig, PipeError, Role, SessionCoordinator};

fn bench_ring_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_round_trip");

    for size in [64usize, 1024, 4096] {
        let payload = vec![0xA5u8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            let mut ring = CircularBuffer::with_capacity(8192);
            b.iter(|| {
                let written = ring.append(&payload[..]).unwrap_or(0);
                black_box(ring.consume(written));
            });
        });
    }

    group.finish();
}

fn bench_session_write_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_write_read");

    for size in [64usize, 1024, 4096] {
        let payload = vec![0x5Au8; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            let pc = SessionCoordinator::default();
            let writer = pc.open(Role::Writer).unwrap();
            let reader = pc.open(Role::Reader).unwrap();
            b.iter(|| {
                pc.write(&writer, payload).unwrap();
                black_box(pc.read(&reader, payload.len()).unwrap());
            });
        });
    }

    group.finish();
}

fn bench_cross_thread_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_thread_stream");
    group.sample_size(20);

    for total in [64 * 1024usize, 512 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(total), &total, |b, &total| {
            b.iter(|| {
                let pc = SessionCoordinator::new(PipeConfig::default()).unwrap();
                let reader = pc.open(Role::Reader).unwrap();
                let writer = pc.open(Role::Writer).unwrap();

                let pc_writer = pc.clone();
                let producer = thread::spawn(move || {
                    let chunk = [1u8; 1024];
                    let mut sent = 0;
                    while sent < total {
                        match pc_writer.write(&writer, &chunk[..(total - sent).min(1024)]) {
                            Ok(n) => sent += n,
                            Err(PipeError::NoSpace) => thread::yield_now(),
                            Err(_) => break,
                        }
                    }
                    pc_writer.close(writer).ok();
                });

                let mut received = 0;
                loop {
                    match pc.read(&reader, 8192) {
                        Ok(chunk) if !chunk.is_empty() => received += chunk.len(),
                        _ => break,
                    }
                }
                producer.join().unwrap();
                black_box(received);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ring_round_trip,
    bench_session_write_read,
    bench_cross_thread_stream
);
criterion_main!(benches);
