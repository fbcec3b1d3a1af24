use std::time::Duration;
#[cfg(feature = "cli")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "cli")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceStats {
    pub cpu_avg: f32,
    pub cpu_max: f32,
    pub memory_avg: f32,
    pub memory_max: f32,
    pub samples: usize,
    /// Second-half memory average minus first-half average, in percentage points.
    pub memory_trend: f32,
}

impl PerformanceStats {
    pub fn from_samples(samples: &[ResourceSample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let count = samples.len() as f32;
        let cpu_avg = samples.iter().map(|s| s.cpu_percent).sum::<f32>() / count;
        let cpu_max = samples.iter().map(|s| s.cpu_percent).fold(0.0, f32::max);
        let memory_avg = samples.iter().map(|s| s.memory_percent).sum::<f32>() / count;
        let memory_max = samples.iter().map(|s| s.memory_percent).fold(0.0, f32::max);

        let memory_trend = if samples.len() >= 2 {
            let (first, second) = samples.split_at(samples.len() / 2);
            let avg = |part: &[ResourceSample]| {
                part.iter().map(|s| s.memory_percent).sum::<f32>() / part.len() as f32
            };
            avg(second) - avg(first)
        } else {
            0.0
        };

        Self {
            cpu_avg,
            cpu_max,
            memory_avg,
            memory_max,
            samples: samples.len(),
            memory_trend,
        }
    }

    /// More than five percentage points of growth across a run is reported as a possible leak.
    pub fn suggests_memory_leak(&self) -> bool {
        self.samples > 5 && self.memory_trend > 5.0
    }
}

#[cfg(feature = "cli")]
pub struct PerformanceMonitor {
    samples: Arc<Mutex<Vec<ResourceSample>>>,
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
    interval: Duration,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl PerformanceMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            interval: Duration::from_millis(500),
            enabled,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts sampling on a background task. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if !self.enabled || self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }

        let samples = Arc::clone(&self.samples);
        let running = Arc::clone(&self.running);
        let interval = self.interval;

        self.handle = Some(tokio::spawn(async move {
            let mut system = System::new();
            let started = Instant::now();

            while running.load(Ordering::SeqCst) {
                let sample = take_sample(&mut system, started);
                if let Ok(mut guard) = samples.lock() {
                    guard.push(sample);
                }
                tokio::time::sleep(interval).await;
            }
        }));
    }

    pub async fn stop(&mut self) -> PerformanceStats {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.handle.take() {
            if tokio::time::timeout(Duration::from_secs(2), handle).await.is_err() {
                tracing::warn!("Resource sampler did not stop within 2s");
            }
        }

        PerformanceStats::from_samples(&self.samples())
    }

    pub fn samples(&self) -> Vec<ResourceSample> {
        self.samples
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn log_stats(&self, phase: &str) {
        if !self.enabled {
            return;
        }

        let mut system = System::new();
        let sample = take_sample(&mut system, Instant::now());
        tracing::info!(
            "📊 {} - CPU: {:.1}%, Memory: {:.1}%",
            phase,
            sample.cpu_percent,
            sample.memory_percent
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
fn take_sample(system: &mut System, started: Instant) -> ResourceSample {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let total = system.total_memory();
    let memory_percent = if total > 0 {
        (system.used_memory() as f32 / total as f32) * 100.0
    } else {
        0.0
    };

    ResourceSample {
        cpu_percent: system.global_cpu_usage(),
        memory_percent,
        elapsed: started.elapsed(),
    }
}

#[cfg(feature = "cli")]
impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// No-op monitor when built without the `cli` feature.
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct PerformanceMonitor;

#[cfg(not(feature = "cli"))]
impl PerformanceMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn with_interval(self, _interval: Duration) -> Self {
        self
    }

    pub fn start(&mut self) {}

    pub async fn stop(&mut self) -> PerformanceStats {
        PerformanceStats::default()
    }

    pub fn samples(&self) -> Vec<ResourceSample> {
        Vec::new()
    }

    pub fn log_stats(&self, _phase: &str) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cpu: f32, memory: f32) -> ResourceSample {
        ResourceSample {
            cpu_percent: cpu,
            memory_percent: memory,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_stats_from_samples() {
        let stats = PerformanceStats::from_samples(&[
            sample(10.0, 40.0),
            sample(30.0, 42.0),
            sample(20.0, 50.0),
            sample(40.0, 52.0),
        ]);

        assert_eq!(stats.samples, 4);
        assert!((stats.cpu_avg - 25.0).abs() < f32::EPSILON);
        assert!((stats.cpu_max - 40.0).abs() < f32::EPSILON);
        assert!((stats.memory_max - 52.0).abs() < f32::EPSILON);
        assert!((stats.memory_trend - 10.0).abs() < 1e-4);
        assert!(!stats.suggests_memory_leak());
    }

    #[test]
    fn test_stats_from_no_samples() {
        assert_eq!(PerformanceStats::from_samples(&[]), PerformanceStats::default());
    }

    #[test]
    fn test_leak_detection_needs_enough_samples() {
        let rising: Vec<_> = (0..8).map(|i| sample(5.0, 40.0 + i as f32 * 3.0)).collect();
        let stats = PerformanceStats::from_samples(&rising);
        assert!(stats.memory_trend > 5.0);
        assert!(stats.suggests_memory_leak());
    }

    #[cfg(feature = "cli")]
    #[tokio::test]
    async fn test_disabled_monitor_collects_nothing() {
        let mut monitor = PerformanceMonitor::new(false);
        monitor.start();
        let stats = monitor.stop().await;
        assert_eq!(stats.samples, 0);
        assert!(!monitor.is_enabled());
    }

    #[cfg(feature = "cli")]
    #[tokio::test]
    async fn test_enabled_monitor_samples_in_background() {
        let mut monitor =
            PerformanceMonitor::new(true).with_interval(Duration::from_millis(10));
        monitor.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        let stats = monitor.stop().await;
        assert!(stats.samples >= 1);
        assert!(stats.memory_avg >= 0.0);
    }
}
