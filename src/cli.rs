/// CLI Module
///
/// Command-line interface configuration using clap.
use clap::{Parser, Subcommand};

/// Warehouse ETL Runner
///
/// Load raw event data from object storage into staging tables, then derive
/// the analytical star schema from them
#[derive(Parser, Debug)]
#[command(name = "warehouse-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Warehouse host (overrides WAREHOUSE_HOST env var)
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Warehouse port (overrides WAREHOUSE_PORT env var)
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Warehouse database name (overrides WAREHOUSE_DB env var)
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute the two-stage ETL pipeline (load, then transform)
    Run {
        /// Print the run report as JSON instead of the human summary
        #[arg(long)]
        json: bool,
    },
    /// Create the staging and star-schema tables if they are missing
    Setup,
    /// Open a session, verify it with SELECT 1, and close it
    Check,
}

impl Cli {
    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(port) = self.port {
            if port == 0 {
                anyhow::bail!("Port must be greater than 0");
            }
        }

        if let Some(host) = &self.host {
            if host.is_empty() {
                anyhow::bail!("Host must not be empty");
            }
        }

        Ok(())
    }
}
