//! Benchmarks for telemetry fan-out
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use pitwall::broadcast::{BroadcastHub, Frame, HubConfig, TelemetryEvent};
use std::sync::Arc;

fn sample_event() -> TelemetryEvent {
    TelemetryEvent::from_slice(
        br#"{"speed": 87.4, "rpm": 6120, "coolant_temp": 94, "throttle": 0.82,
             "gps": {"lat": 38.1614, "lon": -122.4547, "alt": 12.3, "sats": 9}}"#,
    )
    .unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let event = sample_event();

    c.bench_function("encode_event", |b| {
        b.iter(|| Frame::telemetry(black_box(&event)).unwrap())
    });
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let event = sample_event();

    for subscribers in [1, 10, 100, 1000] {
        group.throughput(Throughput::Elements(subscribers as u64));

        group.bench_function(format!("fanout_{}", subscribers), |b| {
            b.iter_batched(
                || {
                    let hub = Arc::new(BroadcastHub::new(HubConfig::default()));
                    let subs: Vec<_> = (0..subscribers)
                        .map(|_| hub.subscribe().unwrap())
                        .collect();
                    (hub, subs)
                },
                |(hub, subs)| {
                    hub.publish(black_box(&event)).unwrap();
                    (hub, subs)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_publish);
criterion_main!(benches);
