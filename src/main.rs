use clap::Parser;
use polyemesis_harness::config::cli::{ManagerAction, ManagerCli};
use polyemesis_harness::utils::{logger, validation::Validate};
use polyemesis_harness::{HarnessError, RestreamerManager, SystemCommandRunner};

fn report_and_exit(e: &HarnessError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

#[tokio::main]
async fn main() {
    let cli = ManagerCli::parse();
    logger::init_cli_logger(cli.verbose);

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => report_and_exit(&e),
    };
    if let Err(e) = config.validate() {
        report_and_exit(&e);
    }

    let manager = match RestreamerManager::new(
        cli.compose_file.as_deref(),
        config,
        SystemCommandRunner::new(),
    )
    .await
    {
        Ok(manager) => manager,
        Err(e) => report_and_exit(&e),
    };

    let pull = !cli.no_pull;
    let code = match cli.action {
        ManagerAction::Start => {
            if let Err(e) = manager.start(pull).await {
                eprintln!("\n❌ Failed to start Restreamer");
                report_and_exit(&e);
            }
            if let Err(e) = manager.wait_for_health(None).await {
                eprintln!("\n❌ Restreamer failed health check");
                report_and_exit(&e);
            }
            match manager.get_jwt_token().await {
                Ok(token) => {
                    println!("\n✅ Restreamer is ready!");
                    println!("   URL: {}", manager.base_url());
                    println!("   Username: {}", manager.username());
                    println!("   Token: {}", logger::redact(&token));
                    0
                }
                Err(e) => {
                    println!("\n⚠️ Restreamer is running but authentication failed: {}", e);
                    1
                }
            }
        }
        ManagerAction::Stop => match manager.stop().await {
            Ok(()) => 0,
            Err(e) => report_and_exit(&e),
        },
        ManagerAction::Down => match manager.down(cli.volumes).await {
            Ok(()) => 0,
            Err(e) => report_and_exit(&e),
        },
        ManagerAction::Restart => match manager.restart(pull).await {
            Ok(_) => 0,
            Err(e) => report_and_exit(&e),
        },
        ManagerAction::Status => {
            let status = manager.get_status().await;
            println!("\n📊 Restreamer Status:");
            println!("   Running: {}", mark(status.running));
            println!("   Healthy: {}", mark(status.healthy));
            println!("   Authenticated: {}", mark(status.authenticated));
            if let Some(version) = &status.version {
                println!("   Version: {}", version);
            }
            if status.is_ready() {
                0
            } else {
                1
            }
        }
        ManagerAction::Logs => match manager.logs(cli.follow, cli.tail).await {
            Ok(output) => {
                print!("{}", output.stdout);
                eprint!("{}", output.stderr);
                if output.success() {
                    0
                } else {
                    1
                }
            }
            Err(e) => report_and_exit(&e),
        },
    };

    std::process::exit(code);
}
