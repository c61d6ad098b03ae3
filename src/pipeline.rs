/// Pipeline Module
///
/// Orchestrates one Run: open a session, execute the load stage, execute the
/// transform stage, release the session. The load stage fully commits before
/// the transform stage begins, and the session is closed on every exit path.
use crate::db::{Connect, Session};
use crate::error::EtlError;
use crate::etl::catalog::Catalog;
use crate::etl::runner::run_stage;
use crate::etl::Stage;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;

/// Summary of a successful Run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub load_statements: usize,
    pub transform_statements: usize,
    pub elapsed_seconds: f64,
}

impl RunReport {
    /// Print a human-readable summary
    pub fn print_summary(&self) {
        println!("\n📊 Run Statistics:");
        println!("   ⏱️  Total time: {:.2}s", self.elapsed_seconds);
        println!("   📥 Load statements committed: {}", self.load_statements);
        println!("   ⭐ Transform statements committed: {}", self.transform_statements);
    }

    /// Print the report as a single JSON object
    pub fn print_json(&self) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}

/// The batch ETL pipeline: load staging tables from external storage, then
/// derive the star schema from them.
pub struct Pipeline<C: Connect> {
    connector: C,
    catalog: Catalog,
}

impl<C: Connect> Pipeline<C> {
    pub fn new(connector: C, catalog: Catalog) -> Self {
        Self { connector, catalog }
    }

    /// Execute one Run.
    ///
    /// A connection failure surfaces as `EtlError::Connection` before any
    /// statement is submitted; a statement failure surfaces as
    /// `EtlError::Statement` carrying the stage and zero-based index. In all
    /// cases the session is released before returning. A failed close after
    /// a successful run is logged and does not change the outcome, since it
    /// cannot undo committed work.
    pub async fn run(&self) -> Result<RunReport, EtlError> {
        let started_at = Utc::now();
        let start = Instant::now();

        tracing::info!(
            "starting run: {} load + {} transform statements",
            self.catalog.load_statements().len(),
            self.catalog.transform_statements().len()
        );

        let mut session = self.connector.connect().await.map_err(EtlError::Connection)?;

        let result = self.run_stages(&mut session).await;

        if let Err(e) = session.close().await {
            tracing::warn!("failed to release warehouse session: {}", e);
        }

        result?;

        let report = RunReport {
            started_at,
            load_statements: self.catalog.load_statements().len(),
            transform_statements: self.catalog.transform_statements().len(),
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };

        tracing::info!("run succeeded in {:.2}s", report.elapsed_seconds);
        Ok(report)
    }

    async fn run_stages(&self, session: &mut C::Session) -> Result<(), EtlError> {
        run_stage(session, Stage::Load, self.catalog.load_statements()).await?;
        run_stage(session, Stage::Transform, self.catalog.transform_statements()).await?;
        Ok(())
    }
}
