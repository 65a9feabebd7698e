//! Paced traffic fed through a fixed pool of worker threads.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use tower_turnstile::Gate;

/// One client's request stream.
#[derive(Debug, Clone)]
pub struct Traffic {
    pub key: String,
    pub workers: usize,
    pub requests: usize,
    /// Delay between submitting consecutive requests
    pub pace: Duration,
}

/// What the gate decided over a run.
pub struct Report {
    pub admitted: usize,
    pub rejected: usize,
    /// Time spent inside the gate per request, in nanoseconds
    pub latency: Histogram<u64>,
}

impl Report {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            admitted: 0,
            rejected: 0,
            latency: Histogram::new_with_bounds(1, 60_000_000_000, 3)?,
        })
    }

    fn merge(&mut self, other: &Report) -> anyhow::Result<()> {
        self.admitted += other.admitted;
        self.rejected += other.rejected;
        self.latency.add(&other.latency)?;
        Ok(())
    }
}

/// Submits `traffic.requests` requests, `traffic.pace` apart, to a pool of
/// `traffic.workers` threads that each ask `gate` for a decision.
pub fn run(gate: &Gate, traffic: &Traffic) -> anyhow::Result<Report> {
    let (tx, rx) = mpsc::channel::<String>();
    let rx = Mutex::new(rx);

    thread::scope(|scope| {
        let workers: Vec<_> = (0..traffic.workers.max(1))
            .map(|_| {
                scope.spawn(|| -> anyhow::Result<Report> {
                    let mut local = Report::new()?;
                    loop {
                        // Release the receiver before deciding
                        let job = rx.lock().recv();
                        let Ok(key) = job else { break };

                        let start = Instant::now();
                        let admitted = gate.handle_request(&key);
                        local.latency.record(start.elapsed().as_nanos().max(1) as u64)?;

                        if admitted {
                            local.admitted += 1;
                        } else {
                            local.rejected += 1;
                        }
                    }
                    Ok(local)
                })
            })
            .collect();

        for _ in 0..traffic.requests {
            tx.send(traffic.key.clone())?;
            thread::sleep(traffic.pace);
        }
        drop(tx);

        let mut report = Report::new()?;
        for worker in workers {
            let local = worker
                .join()
                .map_err(|_| anyhow!("simulation worker panicked"))??;
            report.merge(&local)?;
        }
        Ok(report)
    })
}
