use std::fmt;
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use governor::Quota;
use governor::RateLimiter;
use governor::clock::Clock;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;

use turnstile::FixedWindow;
use turnstile::Reason;
use turnstile::Strategy;
use turnstile::TokenBucket;

type GovernorKeyed = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

// Wrapper to bridge Governor's keyed limiter into the turnstile Strategy trait
struct GovernorStrategy {
    limiter: GovernorKeyed,
}

impl fmt::Debug for GovernorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovernorStrategy").finish_non_exhaustive()
    }
}

impl Strategy for GovernorStrategy {
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        match self.limiter.check_key(&key.to_owned()) {
            Ok(_) => ControlFlow::Continue(()),
            Err(negative) => {
                let now = self.limiter.clock().now();
                let wait: Duration = negative.wait_time_from(now);
                ControlFlow::Break(Reason::Overloaded { retry_after: wait })
            }
        }
    }
}

/// Keys the parallel benches spread their requests over.
fn key_pool(size: usize) -> Arc<Vec<String>> {
    Arc::new((0..size).map(|i| format!("client-{i}")).collect())
}

fn bench_single_strategy<S: Strategy>(group_name: &str, c: &mut Criterion, strategy: Arc<S>) {
    let mut group = c.benchmark_group(group_name);
    let keys = key_pool(1024);

    group.bench_function("hot-key", |b| {
        b.iter(|| {
            let _ = black_box(strategy.as_ref()).process(black_box("client-0"));
        })
    });

    group.bench_function("spread-keys", |b| {
        let mut i = 0;
        b.iter(|| {
            i = (i + 1) % keys.len();
            let _ = black_box(strategy.as_ref()).process(&keys[i]);
        })
    });

    group.finish();
}

fn bench_parallel_strategy<S: Strategy + Send + Sync + 'static>(
    group_name: &str,
    c: &mut Criterion,
    strategy: Arc<S>,
) {
    let mut group = c.benchmark_group(group_name);
    let keys = key_pool(1024);

    for (mode, shared) in [("same-key", true), ("own-keys", false)] {
        for threads in [2, 4, 8].iter() {
            let num_threads = *threads;
            group.bench_with_input(
                BenchmarkId::new(mode, format!("{}-threads", num_threads)),
                &num_threads,
                |b, &n| {
                    b.iter_custom(|iters| {
                        let barrier = Arc::new(Barrier::new(n + 1));
                        let mut handles = Vec::with_capacity(n);

                        for t in 0..n {
                            let s = Arc::clone(&strategy);
                            let bar = Arc::clone(&barrier);
                            let keys = Arc::clone(&keys);
                            let iters_per_thread = iters / n as u64;

                            handles.push(thread::spawn(move || {
                                bar.wait(); // Wait for the start signal
                                for i in 0..iters_per_thread {
                                    let key = if shared {
                                        &keys[0]
                                    } else {
                                        // Disjoint key ranges per thread
                                        let per_thread = keys.len() / n;
                                        &keys[t * per_thread + (i as usize % per_thread)]
                                    };
                                    let _ = black_box(s.process(key));
                                }
                            }));
                        }

                        // Synchronize the start across all threads
                        barrier.wait();
                        let start = Instant::now();

                        for handle in handles {
                            let _ = handle.join();
                        }

                        start.elapsed()
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_dynamic_strategy(
    group_name: &str,
    c: &mut Criterion,
    strategy: Arc<dyn Strategy + Send + Sync>,
) {
    let mut group = c.benchmark_group(format!("Dynamic-{}", group_name));

    group.bench_function("hot-key", |b| {
        b.iter(|| {
            let _ = black_box(strategy.as_ref()).admit(black_box("client-0"));
        })
    });

    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let limit_val = 1_000_000;
    let period = Duration::from_secs(60);

    // --- 1. Initialize all strategies ---

    let fw = Arc::new(FixedWindow::new(limit_val, period).unwrap());
    let tb = Arc::new(TokenBucket::new(limit_val, limit_val as f64 / period.as_secs_f64()).unwrap());

    let gov_quota = Quota::per_minute(NonZeroU32::new(limit_val as u32).unwrap());
    let gov = Arc::new(GovernorStrategy {
        limiter: RateLimiter::keyed(gov_quota),
    });

    // --- 2. Run Static Dispatch Benches (Direct calls) ---

    bench_single_strategy("FixedWindow-Static", c, Arc::clone(&fw));
    bench_parallel_strategy("FixedWindow-Static", c, fw.clone());

    bench_single_strategy("TokenBucket-Static", c, Arc::clone(&tb));
    bench_parallel_strategy("TokenBucket-Static", c, tb.clone());

    bench_single_strategy("Governor-Static", c, Arc::clone(&gov));
    bench_parallel_strategy("Governor-Static", c, gov.clone());

    // --- 3. Run Dynamic Dispatch Benches (Trait Objects) ---
    // This is how strategies are bound from configuration

    let strategies: Vec<(&str, Arc<dyn Strategy + Send + Sync>)> = vec![
        ("FixedWindow", fw),
        ("TokenBucket", tb),
        ("Governor", gov),
    ];

    for (name, strategy) in strategies {
        bench_dynamic_strategy(name, c, strategy);
    }
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
