use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, info};

use super::error::Error;
use super::types::{JobMode, JobOutcome};

pub const EXPORT_HEADERS: [&str; 4] = ["Timestamp", "Type", "Inputs", "Results"];

/// One line of the export file. `inputs` and `results` hold JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Type")]
    pub kind: &'static str,
    #[serde(rename = "Inputs")]
    pub inputs: String,
    #[serde(rename = "Results")]
    pub results: String,
}

impl ExportRow {
    pub fn from_outcome(outcome: &JobOutcome) -> Result<Self, Error> {
        let kind = match outcome.job.mode {
            JobMode::Direct { .. } => "direct",
            JobMode::Inverse { .. } => "inverse",
        };

        Ok(ExportRow {
            timestamp: outcome.completed_at.to_rfc3339(),
            kind,
            inputs: serde_json::to_string(&outcome.job)?,
            results: serde_json::to_string(&outcome.result)?,
        })
    }
}

/// Appends outcomes to a CSV writer. Every field is quoted.
pub struct ExportWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> ExportWriter<W> {
    /// Wraps `sink` and writes the header line.
    pub fn new(sink: W) -> Result<Self, Error> {
        let mut export = Self::continuing(sink);
        export.inner.write_record(EXPORT_HEADERS)?;
        Ok(export)
    }

    /// Wraps a sink that already holds the header line.
    pub fn continuing(sink: W) -> Self {
        let inner = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(sink);
        ExportWriter { inner }
    }

    pub fn write_outcomes(&mut self, outcomes: &[JobOutcome]) -> Result<(), Error> {
        for outcome in outcomes {
            self.inner.serialize(ExportRow::from_outcome(outcome)?)?;
        }
        self.inner.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, Error> {
        self.inner
            .into_inner()
            .map_err(|e| Error::IoError(e.into_error()))
    }
}

/// Async consumer that writes every outcome batch to the export file.
pub struct ResultWriter {
    path: PathBuf,
    receiver: Receiver<Vec<JobOutcome>>,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>, receiver: Receiver<Vec<JobOutcome>>) -> Self {
        ResultWriter {
            path: path.into(),
            receiver,
        }
    }

    /// Runs until the worker side closes the channel.
    ///
    /// The file is created up front, so an unwritable path fails before any
    /// job is consumed.
    pub async fn process_outcomes(mut self) -> Result<(), Error> {
        let mut export = ExportWriter::new(File::create(&self.path)?)?;
        info!("Writer ready: {}", self.path.display());

        let mut written = 0usize;
        while let Some(outcomes) = self.receiver.recv().await {
            export.write_outcomes(&outcomes)?;
            written += outcomes.len();
            debug!("Writer appended {} rows.", outcomes.len());
        }

        info!("Receiver closed, writer stored {} rows.", written);
        Ok(())
    }

    pub fn spawn_task(self) -> tokio::task::JoinHandle<Result<(), Error>> {
        tokio::spawn(self.process_outcomes())
    }
}
