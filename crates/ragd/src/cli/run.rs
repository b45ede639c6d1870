use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragd_core::config::{ObservabilityConfig, RagdConfig};

use crate::runtime::Ragd;

/// Run the ragd server.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "ragd.toml")]
    pub config: String,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Enable development mode (verbose logging).
    #[arg(long)]
    pub dev: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let config = self.load_config()?;
        init_tracing(&config.observability, self.dev);

        println!();
        for line in banner(&config, self.dev) {
            println!("{}", line);
        }
        println!();

        info!(
            config = %self.config,
            database = %config.database.redacted_url(),
            lock_backend = ?config.lock.backend,
            lock_name = %config.progress.lock_name,
            lock_timeout_secs = config.progress.lock_timeout_secs,
            interval_secs = config.progress.interval_secs,
            "Configuration loaded"
        );

        let ragd = Ragd::builder().config(config).build()?;
        ragd.run().await?;

        println!("\n  {}", style("stopped").dim());
        Ok(())
    }

    /// Load the configuration file and apply command-line overrides.
    fn load_config(&self) -> Result<RagdConfig> {
        let mut config = RagdConfig::from_file(&self.config)
            .with_context(|| format!("Failed to load configuration from {}", self.config))?;

        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
        Ok(config)
    }
}

/// Startup banner. The gateway is not bound yet, so the address is only the configured one.
fn banner(config: &RagdConfig, dev: bool) -> Vec<String> {
    let mut lines = vec![
        format!(
            "  {} v{} ({})",
            style("ragd").bold().cyan(),
            env!("CARGO_PKG_VERSION"),
            config.project.name
        ),
        format!(
            "  {} http://{}:{}",
            style("configured").dim(),
            config.gateway.host,
            config.gateway.port
        ),
    ];
    if dev {
        lines.push(format!("  {}", style("development mode").yellow()));
    }
    lines
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the config.
fn init_tracing(config: &ObservabilityConfig, dev: bool) {
    let level = if dev {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    fn command(path: &str) -> RunCommand {
        RunCommand {
            config: path.to_string(),
            port: None,
            host: None,
            dev: false,
        }
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let file = config_file("[database]\nurl = \"postgres://localhost/rag\"\n");
        let mut cmd = command(file.path().to_str().unwrap());
        cmd.port = Some(3000);
        cmd.host = Some("127.0.0.1".to_string());

        let config = cmd.load_config().unwrap();
        assert_eq!(config.gateway.port, 3000);
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    #[test]
    fn test_load_config_keeps_file_values() {
        let file = config_file(
            "[database]\nurl = \"postgres://localhost/rag\"\n[gateway]\nport = 8080\n",
        );
        let config = command(file.path().to_str().unwrap()).load_config().unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_config_is_usage_error() {
        let err = command("/nonexistent/ragd.toml").load_config().unwrap_err();
        assert_eq!(crate::cli::exit_code(&err), crate::cli::EXIT_USAGE);
    }

    #[test]
    fn test_banner_shows_configured_address() {
        let mut config = RagdConfig::default_with_database_url("postgres://localhost/rag");
        config.gateway.port = 9380;

        let lines = banner(&config, false);
        assert!(lines[1].contains("configured"));
        assert!(lines[1].contains(":9380"));
        assert!(lines.iter().all(|l| !l.contains("listening")));
        assert_eq!(lines.len(), 2);

        assert_eq!(banner(&config, true).len(), 3);
    }
}
