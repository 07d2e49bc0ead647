use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use commons_jobs::{AsyncJob, FnWork};

fn counting_job(iterations: u64) -> AsyncJob<FnWork> {
    let count = Arc::new(AtomicU64::new(0));
    let c = count.clone();

    AsyncJob::builder()
        .name("bench-count")
        .step(move || {
            black_box(c.fetch_add(1, Ordering::Relaxed));
            Ok(())
        })
        .until(move || {
            let done = count.load(Ordering::Relaxed) >= iterations;
            if done {
                count.store(0, Ordering::Relaxed);
            }
            Ok(done)
        })
        .build()
        .expect("bench job")
}

/// Start → run `n` iterations → observe stopped. Dominated by thread spawn
/// for small `n`.
fn bench_run_to_completion(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_to_completion");

    for n in [1u64, 100, 10_000] {
        let job = counting_job(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                job.start().expect("start");
                assert!(job.wait_to_stop(Duration::from_secs(10)));
            });
        });
    }

    group.finish();
}

/// Latency from `stop()` to the worker reporting stopped.
fn bench_stop_latency(c: &mut Criterion) {
    let spinning = Arc::new(AtomicBool::new(false));
    let s = spinning.clone();

    let job = AsyncJob::builder()
        .name("bench-stop")
        .step(move || {
            s.store(true, Ordering::Release);
            Ok(())
        })
        .until(|| Ok(false))
        .build()
        .expect("bench job");

    c.bench_function("stop_latency", |b| {
        b.iter(|| {
            spinning.store(false, Ordering::Release);
            job.start().expect("start");
            while !spinning.load(Ordering::Acquire) {
                std::hint::spin_loop();
            }
            job.stop().expect("stop");
            assert!(job.wait_to_stop(Duration::from_secs(10)));
        });
    });
}

fn bench_status_queries(c: &mut Criterion) {
    let job = counting_job(1);
    job.start().expect("start");
    assert!(job.wait_to_stop(Duration::from_secs(10)));

    c.bench_function("is_running", |b| b.iter(|| black_box(job.is_running())));
    c.bench_function("wait_to_stop_poll", |b| {
        b.iter(|| black_box(job.wait_to_stop(Duration::ZERO)))
    });
}

criterion_group!(
    benches,
    bench_run_to_completion,
    bench_stop_latency,
    bench_status_queries
);
criterion_main!(benches);
