use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use super::Output;

pub mod config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(
    name = "rangebench",
    version = env!("CARGO_PKG_VERSION"),
    about = "Replay time-window range queries and report query latency statistics",
    long_about = "rangebench reads (entity, start, end) tasks from a CSV file, runs one range \
                  query per task on a partitioned worker pool against PostgreSQL/TimescaleDB \
                  and reports count, total, min, median, mean and max query time."
)]
pub struct Cli {
    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute every task in the input file and print the report
    Run(run::RunArgs),
    /// Configuration management
    Config(config::ConfigArgs),
    /// Show version information
    Version,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        super::setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.quiet);

        match self.command {
            Some(Commands::Run(args)) => run::execute(args, self.config.as_deref(), &output).await,
            Some(Commands::Config(args)) => config::execute(args, self.config.as_deref(), &output),
            Some(Commands::Version) => version::execute(&output),
            None => {
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }
}
