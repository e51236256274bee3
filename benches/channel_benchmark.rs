use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Benchmark: Channel creation comparison (custom vs tokio mpsc)
/// 基准测试：通道创建对比（自定义 vs tokio mpsc）
fn bench_channel_creation_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_creation_comparison");

    group.bench_function("coop_sync_mpmc_bounded", |b| {
        b.iter(|| {
            let _channel = coop_sync::mpmc::bounded::<u64>(NonZeroUsize::new(32).unwrap());
        });
    });

    group.bench_function("coop_sync_mpmc_unbounded", |b| {
        b.iter(|| {
            let _channel = coop_sync::mpmc::unbounded::<u64>();
        });
    });

    group.bench_function("tokio_mpsc_bounded", |b| {
        b.iter(|| {
            let _channel = tokio::sync::mpsc::channel::<u64>(32);
        });
    });

    group.finish();
}

/// Benchmark: try_send/try_recv ping-pong without suspension
/// 基准测试：无挂起的 try_send/try_recv 往返
fn bench_channel_try_ops_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_try_ops_comparison");

    group.bench_function("coop_sync_mpmc", |b| {
        let (tx, rx) = coop_sync::mpmc::bounded::<u64>(NonZeroUsize::new(32).unwrap());

        b.iter(|| {
            tx.try_send(1).unwrap();
            rx.try_recv().unwrap()
        });
    });

    group.bench_function("tokio_mpsc", |b| {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<u64>(32);

        b.iter(|| {
            tx.try_send(1).unwrap();
            rx.try_recv().unwrap()
        });
    });

    group.finish();
}

/// Benchmark: Cross-task throughput through a bounded buffer
/// 基准测试：跨任务通过有界缓冲的吞吐
fn bench_channel_throughput_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_throughput_comparison");

    for messages in [100u64, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("coop_sync_mpmc", messages),
            messages,
            |b, &messages| {
                let runtime = tokio::runtime::Runtime::new().unwrap();

                b.to_async(&runtime).iter_custom(|iters| async move {
                    let mut total_duration = Duration::from_secs(0);

                    for _ in 0..iters {
                        let (tx, rx) =
                            coop_sync::mpmc::bounded::<u64>(NonZeroUsize::new(16).unwrap());

                        let start = std::time::Instant::now();

                        let producer = tokio::spawn(async move {
                            for i in 0..messages {
                                tx.send(i).await.unwrap();
                            }
                        });

                        let mut received = 0;
                        while rx.recv().await.is_ok() {
                            received += 1;
                        }
                        assert_eq!(received, messages);

                        producer.await.unwrap();
                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("tokio_mpsc", messages),
            messages,
            |b, &messages| {
                let runtime = tokio::runtime::Runtime::new().unwrap();

                b.to_async(&runtime).iter_custom(|iters| async move {
                    let mut total_duration = Duration::from_secs(0);

                    for _ in 0..iters {
                        let (tx, mut rx) = tokio::sync::mpsc::channel::<u64>(16);

                        let start = std::time::Instant::now();

                        let producer = tokio::spawn(async move {
                            for i in 0..messages {
                                tx.send(i).await.unwrap();
                            }
                        });

                        let mut received = 0;
                        while rx.recv().await.is_some() {
                            received += 1;
                        }
                        assert_eq!(received, messages);

                        producer.await.unwrap();
                        total_duration += start.elapsed();
                    }

                    total_duration
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: Multi-producer fan-in
/// 基准测试：多生产者汇入
fn bench_channel_fan_in_comparison(c: &mut Criterion) {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 100;

    let mut group = c.benchmark_group("channel_fan_in_comparison");

    group.bench_function("coop_sync_mpmc", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let (tx, rx) = coop_sync::mpmc::bounded::<u64>(NonZeroUsize::new(16).unwrap());

                let start = std::time::Instant::now();

                for _ in 0..PRODUCERS {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        for i in 0..PER_PRODUCER {
                            tx.send(i).await.unwrap();
                        }
                    });
                }
                drop(tx);

                let mut received = 0;
                while rx.recv().await.is_ok() {
                    received += 1;
                }
                assert_eq!(received, PRODUCERS * PER_PRODUCER);

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.bench_function("tokio_mpsc", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let (tx, mut rx) = tokio::sync::mpsc::channel::<u64>(16);

                let start = std::time::Instant::now();

                for _ in 0..PRODUCERS {
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        for i in 0..PER_PRODUCER {
                            tx.send(i).await.unwrap();
                        }
                    });
                }
                drop(tx);

                let mut received = 0;
                while rx.recv().await.is_some() {
                    received += 1;
                }
                assert_eq!(received, PRODUCERS * PER_PRODUCER);

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_channel_creation_comparison,
    bench_channel_try_ops_comparison,
    bench_channel_throughput_comparison,
    bench_channel_fan_in_comparison,
);

criterion_main!(benches);
