/// Warehouse ETL Runner
///
/// A two-stage batch pipeline: bulk-copy raw event data from object storage
/// into staging tables, then transform the staged rows into a star schema.
mod cli;
mod config;
mod db;
mod error;
mod etl;
mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use db::{Connect, PgConnector, Session};
use etl::catalog::Catalog;
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    // Configuration is resolved once and passed down explicitly.
    let mut config = Config::from_env().context("Failed to load configuration from environment")?;
    if let Some(host) = cli.host {
        config.warehouse.host = host;
    }
    if let Some(port) = cli.port {
        config.warehouse.port = port;
    }
    if let Some(database) = cli.database {
        config.warehouse.database = database;
    }

    let connector = PgConnector::new(config.warehouse.clone());

    match cli.command {
        Command::Check => {
            println!("🔌 Checking warehouse connectivity...");
            let mut session = connector.connect().await.context("Failed to open warehouse session")?;
            db::ping(&mut session).await.context("Warehouse session check failed")?;
            if let Err(e) = session.close().await {
                tracing::warn!("failed to release warehouse session: {}", e);
            }
            println!("✅ Warehouse reachable at {}:{}", config.warehouse.host, config.warehouse.port);
        }
        Command::Setup => {
            println!("📋 Creating staging and star-schema tables...");
            let mut session = connector.connect().await.context("Failed to open warehouse session")?;
            let created = db::ensure_schema(&mut session).await;
            if let Err(e) = session.close().await {
                tracing::warn!("failed to release warehouse session: {}", e);
            }
            println!("✅ Ensured {} tables", created);
        }
        Command::Run { json } => {
            let catalog = Catalog::new(&config.storage);
            let pipeline = Pipeline::new(connector, catalog);

            println!("🚀 Starting ETL run...");
            match pipeline.run().await {
                Ok(report) => {
                    if json {
                        report.print_json()?;
                    } else {
                        report.print_summary();
                        println!("\n✨ Run complete!");
                    }
                }
                Err(e) => {
                    // Propagating gives a non-zero exit and prints the full
                    // cause chain, including the underlying database error.
                    return Err(anyhow::Error::new(e).context("ETL run failed"));
                }
            }
        }
    }

    Ok(())
}
