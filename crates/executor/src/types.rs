use chrono::{DateTime, Utc};
use common::types::{DirectResult, ExtremesValidation, Hypothesis, InverseResult, Variable};
use serde::Serialize;
use tokio::sync::mpsc::Sender;

use super::error::Error;

/// A contract for any source that feeds calculation jobs into the batch pipeline.
///
/// Decouples the producer task from where jobs come from (a CSV file or
/// generated scenarios). The `Send + Sync + 'static` bounds let the
/// implementation run on the multi-threaded Tokio runtime.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync + 'static {
    async fn run_stream(self, sender: Sender<Vec<CalculationJob>>) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JobMode {
    Direct {
        /// Also run the extremal validator on the predicted interval.
        validate: bool,
    },
    #[serde(rename_all = "camelCase")]
    Inverse {
        target: f64,
        is_relative: bool,
        hypothesis: Hypothesis,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationJob {
    pub id: String,
    pub expression: String,
    pub variables: Vec<Variable>,
    pub mode: JobMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JobResult {
    Direct {
        result: DirectResult,
        validation: Option<ExtremesValidation>,
    },
    Inverse(InverseResult),
    /// The job could not run, e.g. its expression does not parse.
    Failed(String),
}

/// A finished job as it leaves the worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub job: CalculationJob,
    pub result: JobResult,
    pub completed_at: DateTime<Utc>,
}
