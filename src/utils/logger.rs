use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Debug level for the library and its binaries, info for dependencies.
const VERBOSE_FILTER: &str = "info,polyemesis_harness=debug,restreamer_manager=debug,\
obs_helper=debug,api_benchmark=debug,run_scenarios=debug";

pub fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(VERBOSE_FILTER))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON lines, for CI runners that collect structured logs.
pub fn init_json_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

/// Shortens a secret for log output.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(20).collect();
    if prefix.len() < secret.len() {
        format!("{}...", prefix)
    } else {
        format!("<{} chars>", secret.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_long_token_keeps_prefix() {
        let token = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.payload";
        assert_eq!(redact(token), "eyJhbGciOiJIUzI1NiIs...");
    }

    #[test]
    fn test_redact_short_secret_hides_everything() {
        assert_eq!(redact("admin"), "<5 chars>");
    }
}
