use clap::Parser;
use polyemesis_harness::app::scenarios::default_sequence;
use polyemesis_harness::core::scenario::summarize;
use polyemesis_harness::utils::logger;
use polyemesis_harness::utils::validation::Validate;
use polyemesis_harness::{RestreamerApi, TestConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "run-scenarios")]
#[command(about = "Run the end-to-end Restreamer workflows")]
struct Args {
    /// Path to the test configuration (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run id used to name created resources (default: timestamp)
    #[arg(long)]
    run_id: Option<String>,

    /// Run only these scenarios (comma-separated)
    #[arg(long)]
    only: Option<String>,

    /// Readiness probes before giving up
    #[arg(long, default_value = "30")]
    ready_attempts: u32,

    /// Sample host CPU and memory while running
    #[arg(long)]
    monitor: bool,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let mut config = match &args.config {
        Some(path) => TestConfig::from_file(path)?,
        None => TestConfig::load_or_default()?,
    };
    config.apply_env_overrides();
    config.validate()?;

    let mut api = RestreamerApi::from_provider(&config);
    let interval = config.health_check_interval().max(Duration::from_secs(1));
    if !api.wait_for_ready(args.ready_attempts, interval).await {
        anyhow::bail!("Restreamer at {} never became ready", config.base_url());
    }
    api.authenticate().await?;

    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string());
    let mut sequence = default_sequence(run_id).with_monitoring(args.monitor);
    if let Some(only) = &args.only {
        let names: Vec<&str> = only.split(',').map(str::trim).collect();
        sequence.retain(|name| names.contains(&name));
    }
    tracing::info!("🚀 Running {} scenarios (run {})", sequence.len(), sequence.run_id());

    let results = sequence.run_all(api).await;
    let (passed, failed) = summarize(&results);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("\n{}", "=".repeat(70));
        for result in &results {
            let mark = if result.passed { "✅" } else { "❌" };
            println!(
                "{} {:<24} {:>7.2}s {}",
                mark,
                result.name,
                result.duration.as_secs_f64(),
                result.error.as_deref().unwrap_or("")
            );
        }
        println!("{}", "=".repeat(70));
        println!("{} passed, {} failed", passed, failed);
    }

    std::process::exit(if failed == 0 { 0 } else { 1 });
}
