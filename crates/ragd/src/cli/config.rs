use anyhow::{Context, Result};
use clap::Parser;

use ragd_core::config::RagdConfig;

/// Validate and print the resolved configuration.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = "ragd.toml")]
    pub config: String,
}

impl ConfigCommand {
    /// Execute the config command.
    pub fn execute(self) -> Result<()> {
        print!("{}", render(&self.config)?);
        Ok(())
    }
}

/// Load, validate and re-serialize a configuration file.
fn render(path: &str) -> Result<String> {
    let config = RagdConfig::from_file(path)
        .with_context(|| format!("Invalid configuration in {}", path))?;
    Ok(config.to_toml()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nurl = \"postgres://localhost/rag\"").unwrap();

        let rendered = render(file.path().to_str().unwrap()).unwrap();
        assert!(rendered.contains("lock_name = \"update_progress\""));
        assert!(rendered.contains("interval_secs = 6"));
    }

    #[test]
    fn test_render_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://localhost/rag\"\n[progress]\ninterval_secs = 90"
        )
        .unwrap();

        let err = render(file.path().to_str().unwrap()).unwrap_err();
        assert_eq!(super::super::exit_code(&err), super::super::EXIT_USAGE);
    }

    #[test]
    fn test_render_missing_file() {
        assert!(render("/nonexistent/ragd.toml").is_err());
    }
}
