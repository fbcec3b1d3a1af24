use crate::core::api::RestreamerApi;
use crate::utils::error::Result;
use crate::utils::monitor::PerformanceMonitor;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// State handed to every scenario of one run.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub api: RestreamerApi,
    /// Suffix for every resource a scenario creates, so runs never collide.
    pub run_id: String,
    /// Outputs of the scenarios that already passed, keyed by scenario name.
    pub shared: HashMap<String, Value>,
}

impl ScenarioContext {
    pub fn new(api: RestreamerApi, run_id: impl Into<String>) -> Self {
        Self {
            api,
            run_id: run_id.into(),
            shared: HashMap::new(),
        }
    }

    /// `{prefix}_{run_id}`
    pub fn resource_id(&self, prefix: &str) -> String {
        format!("{}_{}", prefix, self.run_id)
    }

    pub fn shared_value(&self, key: &str) -> Option<&Value> {
        self.shared.get(key)
    }
}

/// A multi-step workflow against a live server.
#[async_trait::async_trait]
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    /// Returns a summary that later scenarios can read from `ctx.shared`.
    async fn run(&self, ctx: &ScenarioContext) -> Result<Value>;

    /// Removes whatever `run` created. Runs even when `run` failed and must
    /// not fail itself.
    async fn cleanup(&self, ctx: &ScenarioContext);
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub duration: Duration,
    pub details: Value,
}

pub struct ScenarioSequence {
    scenarios: Vec<Box<dyn Scenario>>,
    monitor: Option<PerformanceMonitor>,
    run_id: String,
}

impl ScenarioSequence {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            scenarios: Vec::new(),
            monitor: None,
            run_id: run_id.into(),
        }
    }

    /// Run id derived from the current time, e.g. `20250101_120000`.
    pub fn timestamped() -> Self {
        Self::new(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| PerformanceMonitor::new(true));
        self
    }

    pub fn add_scenario(&mut self, scenario: Box<dyn Scenario>) {
        self.scenarios.push(scenario);
    }

    /// Keeps only the scenarios whose name passes `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.scenarios.retain(|scenario| keep(scenario.name()));
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Runs every scenario in order. A failure is recorded and the sequence
    /// moves on.
    pub async fn run_all(&mut self, api: RestreamerApi) -> Vec<ScenarioResult> {
        let mut ctx = ScenarioContext::new(api, self.run_id.clone());
        let mut results = Vec::with_capacity(self.scenarios.len());

        if let Some(monitor) = self.monitor.as_mut() {
            monitor.start();
            monitor.log_stats("Scenario run started");
        }

        for scenario in &self.scenarios {
            let name = scenario.name().to_string();
            tracing::info!("▶️ Scenario: {}", name);
            let started = Instant::now();

            let outcome = scenario.run(&ctx).await;
            scenario.cleanup(&ctx).await;
            let duration = started.elapsed();

            let result = match outcome {
                Ok(details) => {
                    tracing::info!("✅ {} passed ({:.2}s)", name, duration.as_secs_f64());
                    ctx.shared.insert(name.clone(), details.clone());
                    ScenarioResult {
                        name,
                        passed: true,
                        error: None,
                        duration,
                        details,
                    }
                }
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", name, e);
                    ScenarioResult {
                        name,
                        passed: false,
                        error: Some(e.to_string()),
                        duration,
                        details: Value::Null,
                    }
                }
            };
            results.push(result);

            if let Some(monitor) = &self.monitor {
                monitor.log_stats(&format!("After {}", scenario.name()));
            }
        }

        if let Some(monitor) = self.monitor.as_mut() {
            let stats = monitor.stop().await;
            tracing::info!(
                "📊 CPU avg {:.1}% / max {:.1}%, memory avg {:.1}% / max {:.1}% ({} samples)",
                stats.cpu_avg,
                stats.cpu_max,
                stats.memory_avg,
                stats.memory_max,
                stats.samples
            );
            if stats.suggests_memory_leak() {
                tracing::warn!("⚠️ Memory grew {:.1}% during the run", stats.memory_trend);
            }
        }

        results
    }
}

pub fn summarize(results: &[ScenarioResult]) -> (usize, usize) {
    let passed = results.iter().filter(|r| r.passed).count();
    (passed, results.len() - passed)
}
