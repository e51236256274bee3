use criterion::{Criterion, criterion_group, criterion_main};
use std::time::Duration;

/// Benchmark: Oneshot channel creation comparison (custom vs tokio)
/// 基准测试：Oneshot 通道创建对比（自定义 vs tokio）
fn bench_oneshot_creation_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("oneshot_creation_comparison");

    group.bench_function("coop_sync_oneshot", |b| {
        b.iter(|| {
            let _channel = coop_sync::oneshot::channel::<u64>();
        });
    });

    group.bench_function("tokio_oneshot", |b| {
        b.iter(|| {
            let _channel = tokio::sync::oneshot::channel::<u64>();
        });
    });

    group.finish();
}

/// Benchmark: Send before receive (fast path)
/// 基准测试：接收前发送（快速路径）
fn bench_oneshot_fast_path_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("oneshot_fast_path_comparison");

    group.bench_function("coop_sync_oneshot", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter(|| async {
            let (tx, mut rx) = coop_sync::oneshot::channel();
            tx.send(1u64).unwrap();
            rx.recv().await.unwrap()
        });
    });

    group.bench_function("tokio_oneshot", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter(|| async {
            let (tx, rx) = tokio::sync::oneshot::channel();
            tx.send(1u64).unwrap();
            rx.await.unwrap()
        });
    });

    group.finish();
}

/// Benchmark: Send from a spawned task (slow path with waker registration)
/// 基准测试：从派生任务发送（包含 waker 注册的慢速路径）
fn bench_oneshot_cross_task_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("oneshot_cross_task_comparison");

    group.bench_function("coop_sync_oneshot", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let (tx, mut rx) = coop_sync::oneshot::channel();

                let start = std::time::Instant::now();

                tokio::spawn(async move {
                    tx.send(1u64).unwrap();
                });
                rx.recv().await.unwrap();

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.bench_function("tokio_oneshot", |b| {
        let runtime = tokio::runtime::Runtime::new().unwrap();

        b.to_async(&runtime).iter_custom(|iters| async move {
            let mut total_duration = Duration::from_secs(0);

            for _ in 0..iters {
                let (tx, rx) = tokio::sync::oneshot::channel();

                let start = std::time::Instant::now();

                tokio::spawn(async move {
                    tx.send(1u64).unwrap();
                });
                rx.await.unwrap();

                total_duration += start.elapsed();
            }

            total_duration
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_oneshot_creation_comparison,
    bench_oneshot_fast_path_comparison,
    bench_oneshot_cross_task_comparison,
);

criterion_main!(benches);
