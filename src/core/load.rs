//! Load-testing helpers: concurrent fan-out, latency sampling and
//! fixed-window throughput.

use crate::utils::error::Result;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}

/// Milliseconds over the successful samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputReport {
    pub requests: usize,
    pub errors: usize,
    pub elapsed: Duration,
    pub per_second: f64,
}

/// Runs `op(i)` for `i in 0..total` with at most `max_in_flight` running at once.
pub async fn fire_concurrent<F, Fut, T>(total: usize, max_in_flight: usize, op: F) -> LoadReport
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let started = Instant::now();

    for i in 0..total {
        let semaphore = Arc::clone(&semaphore);
        let fut = op(i);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            fut.await.map(|_| ())
        });
    }

    let mut succeeded = 0;
    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => succeeded += 1,
            Ok(Err(e)) => {
                tracing::debug!("Concurrent request failed: {}", e);
                failed += 1;
            }
            Err(e) => {
                tracing::warn!("Load task panicked: {}", e);
                failed += 1;
            }
        }
    }

    let report = LoadReport {
        total,
        succeeded,
        failed,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        "🔀 {} concurrent requests: {} ok, {} failed in {:.2}s",
        report.total,
        report.succeeded,
        report.failed,
        report.elapsed.as_secs_f64()
    );
    report
}

/// Runs `op` `samples` times sequentially, timing the successful calls.
pub async fn measure_latency<F, Fut, T>(samples: usize, mut op: F) -> LatencyStats
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut timings = Vec::with_capacity(samples);
    let mut failures = 0;

    for _ in 0..samples {
        let started = Instant::now();
        match op().await {
            Ok(_) => timings.push(started.elapsed().as_secs_f64() * 1000.0),
            Err(e) => {
                tracing::debug!("Latency sample failed: {}", e);
                failures += 1;
            }
        }
    }

    if timings.is_empty() {
        return LatencyStats {
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            samples: 0,
            failures,
        };
    }

    LatencyStats {
        avg: timings.iter().sum::<f64>() / timings.len() as f64,
        min: timings.iter().cloned().fold(f64::INFINITY, f64::min),
        max: timings.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        samples: timings.len(),
        failures,
    }
}

/// Calls `op` back-to-back until `duration` has passed. Only successful
/// calls count towards `requests` and `per_second`.
pub async fn measure_throughput<F, Fut, T>(duration: Duration, mut op: F) -> ThroughputReport
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut requests = 0;
    let mut errors = 0;

    while started.elapsed() < duration {
        match op().await {
            Ok(_) => requests += 1,
            Err(_) => errors += 1,
        }
    }

    let elapsed = started.elapsed();
    let per_second = if elapsed.is_zero() {
        0.0
    } else {
        requests as f64 / elapsed.as_secs_f64()
    };

    ThroughputReport {
        requests,
        errors,
        elapsed,
        per_second,
    }
}
