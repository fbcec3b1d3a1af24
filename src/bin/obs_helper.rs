use clap::{Parser, ValueEnum};
use polyemesis_harness::config::test_config::DEFAULT_PLUGIN_NAME;
use polyemesis_harness::utils::logger;
use polyemesis_harness::{ObsManager, SystemCommandRunner};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    Status,
    Install,
    Uninstall,
    Verify,
    TestLoad,
}

#[derive(Parser)]
#[command(name = "obs-helper")]
#[command(about = "OBS Studio and plugin helper for the test suites")]
struct Args {
    /// Action to perform
    #[arg(value_enum)]
    action: Action,

    /// CMake build directory (for install)
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Seconds to run OBS for test-load
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Plugin to manage
    #[arg(long, default_value = DEFAULT_PLUGIN_NAME)]
    plugin: String,

    /// Print the status report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let manager = match ObsManager::new(&args.plugin) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    let ok = match args.action {
        Action::Status => {
            let requirements = manager
                .check_obs_requirements(&SystemCommandRunner::new())
                .await;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&requirements)?);
            } else {
                println!("{}", requirements.render());
            }
            true
        }
        Action::Install => {
            let Some(build_dir) = &args.build_dir else {
                eprintln!("❌ --build-dir required for install action");
                std::process::exit(1);
            };
            match manager.install_plugin(build_dir) {
                Ok(path) => {
                    println!("✅ Installed to {}", path.display());
                    true
                }
                Err(e) => {
                    eprintln!("❌ {}", e);
                    eprintln!("💡 {}", e.recovery_suggestion());
                    false
                }
            }
        }
        Action::Uninstall => match manager.uninstall_plugin() {
            Ok(()) => true,
            Err(e) => {
                eprintln!("❌ Failed to uninstall plugin: {}", e);
                false
            }
        },
        Action::Verify => {
            let issues = manager.verify_plugin_installation();
            if issues.is_empty() {
                println!("✅ Plugin installation is valid");
            } else {
                println!("❌ Plugin installation has issues:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
            issues.is_empty()
        }
        Action::TestLoad => {
            let check = manager
                .test_plugin_load(Duration::from_secs(args.timeout))
                .await;
            println!("{} {}", if check.loaded { "✅" } else { "❌" }, check.message);
            check.loaded
        }
    };

    std::process::exit(if ok { 0 } else { 1 });
}
