use clap::Parser;
use polyemesis_harness::core::load::{fire_concurrent, measure_latency, measure_throughput};
use polyemesis_harness::domain::model::{ProcessCommand, ProcessOutput};
use polyemesis_harness::utils::logger;
use polyemesis_harness::utils::monitor::PerformanceMonitor;
use polyemesis_harness::utils::validation::Validate;
use polyemesis_harness::{RestreamerClient, TestConfig};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Average `GET /about` latency above this fails the run.
const MAX_ABOUT_AVG_MS: f64 = 1000.0;
const MIN_THROUGHPUT: f64 = 10.0;

#[derive(Parser)]
#[command(name = "api-benchmark")]
#[command(about = "Benchmark a live Restreamer: latency, throughput, concurrency and churn")]
struct Args {
    /// Path to the test configuration (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Latency samples per endpoint
    #[arg(long, default_value = "10")]
    samples: usize,

    /// Throughput window in seconds
    #[arg(long, default_value = "5")]
    duration: u64,

    /// Concurrent GET /process requests
    #[arg(long, default_value = "20")]
    concurrency: usize,

    /// Upper bound on requests in flight
    #[arg(long, default_value = "10")]
    max_in_flight: usize,

    /// Create/delete iterations for the churn run (0 disables it)
    #[arg(long, default_value = "10")]
    churn: usize,

    /// Start/stop cycles on one process (0 disables them)
    #[arg(long, default_value = "5")]
    cycles: usize,

    /// Sample host CPU and memory while running
    #[arg(long)]
    monitor: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let mut config = match &args.config {
        Some(path) => TestConfig::from_file(path)?,
        None => TestConfig::load_or_default()?,
    };
    config.apply_env_overrides();
    config.validate()?;

    let client = RestreamerClient::from_provider(&config);
    if !client.test_connection().await {
        anyhow::bail!("cannot reach Restreamer at {}", client.base_url());
    }

    let mut monitor = PerformanceMonitor::new(args.monitor);
    monitor.start();

    let mut failures = Vec::new();

    tracing::info!("⏱️ Benchmarking API response times...");
    for endpoint in ["/api/v3/about", "/api/v3/process", "/api/v3/config"] {
        let stats = measure_latency(args.samples, || client.get(endpoint)).await;
        println!(
            "📊 GET {}: {:.2}ms avg ({:.2}-{:.2}ms, {} failed)",
            endpoint, stats.avg, stats.min, stats.max, stats.failures
        );
        if endpoint == "/api/v3/about" && stats.samples > 0 && stats.avg >= MAX_ABOUT_AVG_MS {
            failures.push(format!("GET /about averaged {:.0}ms", stats.avg));
        }
    }

    tracing::info!("📈 Measuring API throughput...");
    let throughput =
        measure_throughput(Duration::from_secs(args.duration), || client.get("/api/v3/about"))
            .await;
    println!(
        "📊 Throughput: {} requests, {} errors in {:.2}s ({:.1} req/s)",
        throughput.requests,
        throughput.errors,
        throughput.elapsed.as_secs_f64(),
        throughput.per_second
    );
    if throughput.per_second <= MIN_THROUGHPUT {
        failures.push(format!("throughput {:.1} req/s", throughput.per_second));
    }

    tracing::info!("🔀 Firing {} concurrent requests...", args.concurrency);
    let report = fire_concurrent(args.concurrency, args.max_in_flight, |_| {
        let client = client.clone();
        async move { client.list_processes().await }
    })
    .await;
    println!(
        "📊 Concurrent: {}/{} succeeded in {:.2}s",
        report.succeeded,
        report.total,
        report.elapsed.as_secs_f64()
    );
    if report.succeeded == 0 && report.total > 0 {
        failures.push("no concurrent request succeeded".to_string());
    }

    let run_id = chrono::Utc::now().timestamp();

    if args.cycles > 0 {
        tracing::info!("🔄 Testing rapid start/stop cycles...");
        let process_id = format!("rapid_test_{}", run_id);
        client
            .create_process(&process_id, "rtmp://localhost/rapid", Vec::<ProcessOutput>::new())
            .await?;

        let mut total = Duration::ZERO;
        for i in 0..args.cycles {
            let started = Instant::now();
            // Start and stop may be rejected while FFmpeg is still settling.
            let _ = client.send_command(&process_id, ProcessCommand::Start).await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = client.send_command(&process_id, ProcessCommand::Stop).await;
            let elapsed = started.elapsed();
            total += elapsed;
            println!("✅ Cycle {}/{}: {:.2}s", i + 1, args.cycles, elapsed.as_secs_f64());
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        client.cleanup_processes(&[process_id]).await;

        let avg = total.as_secs_f64() / args.cycles as f64;
        println!("📊 Average cycle time: {:.2}s", avg);
        if avg >= 10.0 {
            failures.push(format!("start/stop cycles averaged {:.1}s", avg));
        }
    }

    if args.churn > 0 {
        tracing::info!("🔍 Creating and deleting {} processes...", args.churn);
        for i in 0..args.churn {
            let process_id = format!("leak_test_{}_{}", run_id, i);
            let outcome: polyemesis_harness::Result<bool> = async {
                client
                    .create_process(&process_id, &format!("rtmp://localhost/leak{}", i), Vec::new())
                    .await?;
                client.delete_process(&process_id).await
            }
            .await;
            if let Err(e) = outcome {
                tracing::warn!("⚠️ Iteration {} error: {}", i + 1, e);
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    let stats = monitor.stop().await;
    if monitor.is_enabled() {
        println!(
            "📊 Host: CPU avg {:.1}% max {:.1}%, memory avg {:.1}% max {:.1}%, trend {:+.1}%",
            stats.cpu_avg, stats.cpu_max, stats.memory_avg, stats.memory_max, stats.memory_trend
        );
        if stats.suggests_memory_leak() {
            println!("⚠️ WARNING: Potential memory leak detected");
        }
    }

    if failures.is_empty() {
        println!("✅ Benchmark completed");
        Ok(())
    } else {
        for failure in &failures {
            eprintln!("❌ {}", failure);
        }
        std::process::exit(1);
    }
}
