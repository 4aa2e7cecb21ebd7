#![deny(unsafe_code)]

//! siactl CLI: launch and query a `siad` daemon.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use siactl_config::{ApiPassword, AppConfig};
use siactl_core::{ApiRequest, DaemonVersion, Method, SiaClient};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// siactl: launcher and API client for the Sia daemon.
#[derive(Parser)]
#[command(name = "siactl", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "siactl.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start siad with flags derived from the configuration.
    Launch {
        /// Path to the siad binary (overrides `launch.binary`).
        #[arg(long)]
        binary: Option<PathBuf>,

        /// Wait for the daemon to exit instead of returning after spawn.
        #[arg(long)]
        foreground: bool,
    },

    /// Check whether the daemon answers API calls.
    Status,

    /// Print the daemon version.
    Version,

    /// Print gateway information.
    Gateway,

    /// Ask the daemon to shut down.
    Stop,

    /// Call an arbitrary API endpoint and print the JSON response.
    Call {
        /// Endpoint path, e.g. `/consensus`.
        endpoint: String,

        /// HTTP method.
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Query parameters as `key=value`; may be repeated.
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,

        /// Request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Print the flags `launch` would pass to siad.
    Flags,

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    let filter = log_level(&config.logging.level, cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match cli.command {
        Commands::Launch { binary, foreground } => {
            cmd_launch(&config, binary.as_deref(), foreground).await?
        }
        Commands::Status => cmd_status(&config).await?,
        Commands::Version => cmd_version(&config).await?,
        Commands::Gateway => cmd_gateway(&config).await?,
        Commands::Stop => cmd_stop(&config).await?,
        Commands::Call {
            endpoint,
            method,
            query,
            timeout,
        } => cmd_call(&config, endpoint, &method, query, timeout).await?,
        Commands::Flags => cmd_flags(&config)?,
        Commands::Config { show } => cmd_config(&cli.config, &config, show)?,
    }

    Ok(())
}

async fn cmd_launch(config: &AppConfig, binary: Option<&Path>, foreground: bool) -> Result<()> {
    let client = build_client(config)?;
    let binary = binary.unwrap_or(config.launch.binary.as_path());

    let pid = client.launch(binary).await?;
    println!("Launched {} (pid {pid})", binary.display());

    if foreground
        && let Some(mut process) = client.take_process().await
    {
        info!(pid, "Waiting for daemon to exit");
        if let Some(status) = process.wait().await? {
            println!("Daemon exited: {status}");
        }
    }
    Ok(())
}

async fn cmd_status(config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    let version = probe_status(&client).await?;
    let settings = client.settings();
    println!(
        "Daemon at {}:{} is reachable (siad {}).",
        settings.api_host, settings.api_port, version.version
    );
    Ok(())
}

/// Read-only liveness check. Uses `/daemon/version` rather than
/// [`SiaClient::is_running`], whose untracked probe stops the daemon.
async fn probe_status(client: &SiaClient) -> Result<DaemonVersion> {
    let settings = client.settings();
    client.daemon_version().await.with_context(|| {
        format!(
            "daemon at {}:{} is not answering",
            settings.api_host, settings.api_port
        )
    })
}

async fn cmd_version(config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    let version = client.daemon_version().await?;
    println!("siad {} ({})", version.version, version.gitrevision);
    Ok(())
}

async fn cmd_gateway(config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    let gateway = client.gateway().await?;
    println!("{}", serde_json::to_string_pretty(&gateway)?);
    Ok(())
}

async fn cmd_stop(config: &AppConfig) -> Result<()> {
    info!("Sending stop request to siad");
    let client = build_client(config)?;
    client.daemon_stop().await?;
    println!("Stop requested.");
    Ok(())
}

async fn cmd_call(
    config: &AppConfig,
    endpoint: String,
    method: &str,
    query: Vec<(String, String)>,
    timeout: Option<u64>,
) -> Result<()> {
    let client = build_client(config)?;
    let method: Method = method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("invalid HTTP method {method:?}"))?;

    let mut request = ApiRequest::new(endpoint).with_method(method);
    for (key, value) in query {
        request = request.with_query(key, value);
    }
    if let Some(secs) = timeout {
        request = request.with_timeout(std::time::Duration::from_secs(secs));
    }

    let body = client.call(request).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn cmd_flags(config: &AppConfig) -> Result<()> {
    let client = build_client(config)?;
    for flag in client.flags() {
        println!("{}", redact_flag(&flag));
    }
    Ok(())
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<()> {
    if show {
        let mut shown = config.clone();
        if shown.client.api_authentication_password.is_some() {
            shown.client.api_authentication_password = Some(ApiPassword::new("[REDACTED]"));
        }
        let toml_str =
            toml::to_string_pretty(&shown).map_err(|e| anyhow::anyhow!("TOML error: {e}"))?;
        println!("{toml_str}");
    } else {
        println!("Configuration at '{}' is valid.", config_path.display());
    }
    Ok(())
}

fn build_client(config: &AppConfig) -> Result<SiaClient> {
    SiaClient::builder(config.client.clone())
        .max_sockets(config.launch.max_sockets)
        .build()
        .context("failed to configure daemon client")
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))
    } else {
        Ok(AppConfig::default())
    }
}

/// The more verbose of the configured level and the `-v` count.
fn log_level(configured: &str, verbose: u8) -> &str {
    const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    let flag = match verbose {
        0 => 0,
        1 => 3,
        _ => 4,
    };
    let base = LEVELS.iter().position(|l| *l == configured).unwrap_or(2);
    LEVELS[base.max(flag)]
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn redact_flag(flag: &str) -> String {
    match flag.strip_prefix("--temp-password=") {
        Some(_) => "--temp-password=[REDACTED]".to_string(),
        None => flag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use siactl_test_utils::{MOCK_VERSION, MockDaemon, StaticCredentials};

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_call_with_query() {
        let cli = Cli::parse_from([
            "siactl", "call", "/renter/files", "-X", "post", "-q", "siapath=a", "-q", "force=true",
        ]);
        match cli.command {
            Commands::Call {
                endpoint,
                method,
                query,
                timeout,
            } => {
                assert_eq!(endpoint, "/renter/files");
                assert_eq!(method, "post");
                assert_eq!(
                    query,
                    vec![
                        ("siapath".to_string(), "a".to_string()),
                        ("force".to_string(), "true".to_string()),
                    ]
                );
                assert_eq!(timeout, None);
            }
            _ => panic!("expected call command"),
        }
    }

    #[test]
    fn test_parse_key_value_rejects_missing_equals() {
        assert!(parse_key_value("siapath").is_err());
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
    }

    #[test]
    fn test_log_level_takes_more_verbose() {
        assert_eq!(log_level("warn", 0), "warn");
        assert_eq!(log_level("info", 1), "debug");
        assert_eq!(log_level("trace", 1), "trace");
        assert_eq!(log_level("error", 2), "trace");
        assert_eq!(log_level("debug", 0), "debug");
    }

    #[tokio::test]
    async fn test_status_reads_version_without_stopping_daemon() {
        let daemon = MockDaemon::start().await;
        let client = SiaClient::builder(daemon.client_config())
            .credentials(StaticCredentials::none())
            .build()
            .unwrap();

        let version = probe_status(&client).await.unwrap();

        assert_eq!(version.version, MOCK_VERSION);
        assert_eq!(daemon.stop_calls(), 0);
        let paths: Vec<_> = daemon.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/daemon/version"]);
    }

    #[tokio::test]
    async fn test_status_reports_unanswering_daemon() {
        let daemon = MockDaemon::builder().fail_version().start().await;
        let client = SiaClient::builder(daemon.client_config())
            .credentials(StaticCredentials::none())
            .build()
            .unwrap();

        let err = probe_status(&client).await.unwrap_err();

        assert!(err.to_string().contains("is not answering"), "{err}");
        assert_eq!(daemon.stop_calls(), 0);
    }

    #[test]
    fn test_redact_flag() {
        assert_eq!(redact_flag("--temp-password=foo"), "--temp-password=[REDACTED]");
        assert_eq!(redact_flag("--api-addr=localhost:9980"), "--api-addr=localhost:9980");
    }
}
