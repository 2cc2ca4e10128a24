use crate::utils::error::{IntegrationError, Result};
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Parser)]
#[command(name = "openstack-integration")]
#[command(about = "Answer OpenStack integration requests over a relation")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Answer every pending request in a relation snapshot
    Fulfill {
        #[arg(long, help = "Provider TOML configuration")]
        config: PathBuf,

        #[arg(long, help = "Relation snapshot (JSON)")]
        relation: PathBuf,

        #[arg(long, help = "Where to write the updated snapshot [default: --relation]")]
        output: Option<PathBuf>,
    },
    /// Render cloud.conf from the data an integrator published
    Render {
        #[arg(long, help = "Databag received from the integrator (JSON)")]
        databag: PathBuf,

        #[arg(long, default_value = "openstack")]
        endpoint: String,

        #[arg(long, help = "Print the config base64 encoded")]
        base64: bool,
    },
}

fn require_file(field_name: &str, path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(IntegrationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.display().to_string(),
            reason: "File does not exist".to_string(),
        });
    }
    Ok(())
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Fulfill {
                config, relation, ..
            } => {
                require_file("--config", config)?;
                require_file("--relation", relation)
            }
            Command::Render { databag, .. } => require_file("--databag", databag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fulfill() {
        let cli = CliConfig::parse_from([
            "openstack-integration",
            "fulfill",
            "--config",
            "provider.toml",
            "--relation",
            "relation.json",
            "--verbose",
        ]);

        assert!(cli.verbose);
        assert!(!cli.json_logs);
        match cli.command {
            Command::Fulfill { output, .. } => assert!(output.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_validate_missing_files() {
        let cli = CliConfig::parse_from([
            "openstack-integration",
            "render",
            "--databag",
            "/nonexistent/databag.json",
        ]);

        assert!(cli.validate().is_err());
    }
}
