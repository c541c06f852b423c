/*!
 * Bounded Execution Benchmarks
 *
 * Measures the overhead of the unbounded fast path and of a full
 * watchdog spawn/join cycle around trivially fast work.
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::convert::Infallible;
use std::time::Duration;
use timebound::{timeout, Supervisor};

/// Benchmark: `None` duration (direct call, no watchdog)
fn bench_unbounded_fast_path(c: &mut Criterion) {
    c.bench_function("timeout/unbounded_fast_path", |b| {
        b.iter(|| {
            let result = timeout(None, || Ok::<_, Infallible>(black_box(42)));
            black_box(result)
        })
    });
}

/// Benchmark: full bounded cycle without signal interception
fn bench_bounded_immediate_success(c: &mut Criterion) {
    let supervisor = Supervisor::new().with_signal_interception(false);

    c.bench_function("timeout/bounded_immediate_success", |b| {
        b.iter(|| {
            let result = supervisor.execute(Some(Duration::from_secs(2)), || {
                Ok::<_, Infallible>(black_box(42))
            });
            black_box(result)
        })
    });
}

/// Benchmark: full bounded cycle including sigaction install/restore
fn bench_bounded_with_interception(c: &mut Criterion) {
    let supervisor = Supervisor::new();

    c.bench_function("timeout/bounded_with_interception", |b| {
        b.iter(|| {
            let result = supervisor.execute(Some(Duration::from_secs(2)), || {
                Ok::<_, Infallible>(black_box(42))
            });
            black_box(result)
        })
    });
}

criterion_group!(
    benches,
    bench_unbounded_fast_path,
    bench_bounded_immediate_success,
    bench_bounded_with_interception
);
criterion_main!(benches);
