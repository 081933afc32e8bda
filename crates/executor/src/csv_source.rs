use common::types::Hypothesis;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use tokio::sync::mpsc::Sender;
use tracing::{error, info};

use super::error::Error;
use super::format::{DecimalLocale, parse_variable_list, try_parse_number};
use super::types::{CalculationJob, JobMode, JobSource};

/// One row of a job file.
///
/// Header: `id,mode,expression,variables,target,relative,hypothesis,validate`.
/// `variables` holds `name=value±bound` items separated by `;`. The last four
/// columns may be empty where the mode does not use them.
#[derive(Debug, Deserialize, Default)]
pub struct CsvRecord {
    pub id: String,
    pub mode: String,
    pub expression: String,
    pub variables: String,
    pub target: Option<String>,
    pub relative: Option<bool>,
    pub hypothesis: Option<String>,
    pub validate: Option<bool>,
}

impl CsvRecord {
    pub fn into_job(self, locale: DecimalLocale) -> Result<CalculationJob, Error> {
        let variables = parse_variable_list(&self.variables, locale)?;

        let mode = match self.mode.trim().to_ascii_lowercase().as_str() {
            "direct" => JobMode::Direct {
                validate: self.validate.unwrap_or(false),
            },
            "inverse" => {
                let target_text = self.target.unwrap_or_default();
                let target = try_parse_number(&target_text, locale).ok_or_else(|| {
                    Error::InvalidInput(format!("job {}: invalid target '{}'", self.id, target_text))
                })?;
                let hypothesis = match self.hypothesis.as_deref().map(str::trim) {
                    None | Some("") => Hypothesis::H1,
                    Some(text) => text
                        .parse()
                        .map_err(|e| Error::InvalidInput(format!("job {}: {}", self.id, e)))?,
                };
                JobMode::Inverse {
                    target,
                    is_relative: self.relative.unwrap_or(false),
                    hypothesis,
                }
            }
            other => {
                return Err(Error::InvalidInput(format!(
                    "job {}: unknown mode '{}'",
                    self.id, other
                )));
            }
        };

        Ok(CalculationJob {
            id: self.id,
            expression: self.expression,
            variables,
            mode,
        })
    }
}

/// Reads jobs from a CSV file and sends them downstream in batches.
pub struct CsvJobSource {
    path: PathBuf,
    batch_size: usize,
    locale: DecimalLocale,
}

impl CsvJobSource {
    pub fn new(path: impl Into<PathBuf>, batch_size: usize, locale: DecimalLocale) -> Self {
        CsvJobSource {
            path: path.into(),
            batch_size: batch_size.max(1),
            locale,
        }
    }

    fn parse_csv_to_jobs(&self) -> Result<Vec<CalculationJob>, Error> {
        let file = File::open(&self.path).map_err(|e| {
            error!(path = %self.path.display(), error = ?e, "failed to read job file");
            Error::IoError(e)
        })?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut jobs = Vec::new();

        for result in rdr.deserialize() {
            let record: CsvRecord = result?;
            jobs.push(record.into_job(self.locale)?);
        }
        Ok(jobs)
    }
}

#[async_trait::async_trait]
impl JobSource for CsvJobSource {
    async fn run_stream(self, sender: Sender<Vec<CalculationJob>>) -> Result<(), Error> {
        let all_jobs = self.parse_csv_to_jobs()?;
        let total_jobs = all_jobs.len();
        let mut jobs_sent = 0;

        info!("CsvJobSource: starting transfer of {} jobs...", total_jobs);

        for chunk in all_jobs.chunks(self.batch_size) {
            if let Err(e) = sender.send(chunk.to_vec()).await {
                error!(
                    "CsvJobSource shutting down: worker receiver dropped during send. Error: {}",
                    e
                );
                return Err(Error::ChannelSendFailed);
            }

            jobs_sent += chunk.len();
        }

        info!("CsvJobSource: transferred {} jobs in batches.", jobs_sent);
        Ok(())
    }
}
