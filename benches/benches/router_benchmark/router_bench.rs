use std::hint::black_box;

use bytes::Bytes;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use switchyard::{Message, Router, RouterConfig};

fn payload() -> Bytes {
    Bytes::from_static(b"benchmark payload")
}

fn router() -> Router {
    Router::new(RouterConfig::default().with_mailbox_capacity(64))
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let router = router();
    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            router.subscribe(black_box("u1"), black_box("chan")).unwrap();
            router.unsubscribe("u1", "chan").unwrap();
        })
    });
}

fn bench_publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fan_out");
    for subscribers in [0usize, 1, 10, 100] {
        let router = router();
        router.add_channel("chan").unwrap();
        for i in 0..subscribers {
            router.subscribe(&format!("u{i}"), "chan").unwrap();
        }

        group.throughput(Throughput::Elements(subscribers.max(1) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let report = router.publish_to_channel("chan", payload()).unwrap();
                    // Держим ящики пустыми, иначе память растёт с числом итераций.
                    for id in &report.delivered {
                        let _ = router.dequeue(id);
                    }
                    black_box(report);
                });
            },
        );
    }
    group.finish();
}

fn bench_send_direct(c: &mut Criterion) {
    let router = router();
    let ids: Vec<String> = (0..1_000).map(|i| format!("u{i}")).collect();
    for id in &ids {
        router.register(id).unwrap();
    }
    let mut rng = SmallRng::seed_from_u64(42);

    c.bench_function("send_direct_random_receiver", |b| {
        b.iter(|| {
            let id = &ids[rng.gen_range(0..ids.len())];
            router.send_direct(black_box(id), payload()).unwrap();
            black_box(router.dequeue(id).unwrap());
        })
    });
}

fn bench_route_validated_message(c: &mut Criterion) {
    let router = router();
    router.subscribe("u1", "chan").unwrap();

    c.bench_function("route_built_message", |b| {
        b.iter(|| {
            let message = Message::builder()
                .sender("bench")
                .channel("chan")
                .payload(payload())
                .build()
                .unwrap();
            black_box(router.route(message).unwrap());
            black_box(router.dequeue("u1").unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_subscribe_unsubscribe,
    bench_publish_fan_out,
    bench_send_direct,
    bench_route_validated_message
);
criterion_main!(benches);
