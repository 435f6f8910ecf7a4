pub mod decode;
pub mod dsn;
pub mod options;
pub mod process;

pub use options::InvocationConfig;
pub use process::{Analyzer, ProcessError, SoarProcess};

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::report::types::AnalysisResult;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("SQL analysis did not finish within {0:?} and was cancelled")]
    TimedOut(Duration),
}

/// Couples one analyzer with the options it is invoked with.
///
/// A bridge runs one analysis at a time; run independent bridges for
/// concurrent work.
pub struct Bridge<A> {
    analyzer: A,
    config: InvocationConfig,
}

impl<A: Analyzer> Bridge<A> {
    pub fn new(analyzer: A, config: InvocationConfig) -> Self {
        Self { analyzer, config }
    }

    pub fn config(&self) -> &InvocationConfig {
        &self.config
    }

    /// Run `sql` through the analyzer and decode what it reports.
    #[instrument(skip_all, fields(report_type = %self.config.report_type()))]
    pub async fn analyze(&self, sql: &str) -> Result<AnalysisResult, BridgeError> {
        let statement = process::strip_explain(sql);
        debug!(statement = %statement, "submitting statement");

        let raw = self.analyzer.invoke(&self.config, &statement).await?;
        if raw.is_empty() {
            info!("analyzer produced no output");
        }
        Ok(decode::decode(&raw, self.config.report_type()))
    }

    /// Like [`Bridge::analyze`], but gives up after `limit`.
    ///
    /// The in-flight analyzer is dropped (and with it killed) on expiry;
    /// a timed-out analysis has no partial result.
    pub async fn analyze_with_timeout(
        &self,
        sql: &str,
        limit: Duration,
    ) -> Result<AnalysisResult, BridgeError> {
        tokio::time::timeout(limit, self.analyze(sql))
            .await
            .map_err(|_| BridgeError::TimedOut(limit))?
    }
}
