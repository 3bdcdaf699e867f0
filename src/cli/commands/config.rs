use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use crate::cli::Output;
use crate::config::BenchConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
    /// Validate the merged configuration
    Validate,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

pub fn execute(args: ConfigArgs, config_path: Option<&str>, output: &Output) -> Result<()> {
    match args.command {
        ConfigCommands::Show { format } => {
            let config = BenchConfig::load(config_path, None::<&()>)?;
            let rendered = match format {
                ConfigFormat::Toml => toml::to_string_pretty(&config).context("Failed to serialize configuration")?,
                ConfigFormat::Json => serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?,
            };
            output.document(&rendered);
            Ok(())
        }
        ConfigCommands::Validate => {
            BenchConfig::load(config_path, None::<&()>).context("Configuration is invalid")?;
            output.success("Configuration is valid");
            Ok(())
        }
    }
}
