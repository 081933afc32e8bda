use chrono::Utc;
use errprop_core::{Expression, Propagator};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{info, warn};

use super::error::Error;
use super::types::{CalculationJob, JobMode, JobOutcome, JobResult};

/// Runs one job with `propagator`.
///
/// A malformed expression is reported as `JobResult::Failed` rather than
/// propagated as the fail-soft zero.
pub fn run_job(propagator: &Propagator, job: &CalculationJob) -> JobOutcome {
    let expression = Expression::parse(&job.expression);

    let result = match expression.error() {
        Some(e) => {
            warn!(job = %job.id, error = %e, "skipping malformed expression");
            JobResult::Failed(e.to_string())
        }
        None => match job.mode {
            JobMode::Direct { validate } => {
                let result = propagator.direct(&expression, &job.variables);
                let validation =
                    validate.then(|| propagator.validate(&expression, &job.variables, result.interval));
                JobResult::Direct { result, validation }
            }
            JobMode::Inverse {
                target,
                is_relative,
                hypothesis,
            } => JobResult::Inverse(propagator.inverse(
                &expression,
                &job.variables,
                target,
                is_relative,
                hypothesis,
            )),
        },
    };

    JobOutcome {
        job: job.clone(),
        result,
        completed_at: Utc::now(),
    }
}

/// Async stage that turns job batches into outcome batches.
pub struct Worker {
    propagator: Propagator,
    receiver: Receiver<Vec<CalculationJob>>,
    sender: Sender<Vec<JobOutcome>>,
}

impl Worker {
    pub fn new(
        propagator: Propagator,
        receiver: Receiver<Vec<CalculationJob>>,
        sender: Sender<Vec<JobOutcome>>,
    ) -> Self {
        Worker {
            propagator,
            receiver,
            sender,
        }
    }

    /// Consumes batches until the producer side closes, forwarding each
    /// batch of outcomes to the writer.
    pub async fn process_jobs(mut self) -> Result<(), Error> {
        info!("Worker ready.");
        let mut processed = 0usize;

        while let Some(jobs) = self.receiver.recv().await {
            let outcomes: Vec<JobOutcome> = jobs
                .iter()
                .map(|job| run_job(&self.propagator, job))
                .collect();
            processed += outcomes.len();

            if self.sender.send(outcomes).await.is_err() {
                warn!("Worker shutting down: writer receiver dropped.");
                return Err(Error::ChannelSendFailed);
            }
        }

        info!("Receiver closed, worker processed {} jobs.", processed);
        Ok(())
    }

    pub fn spawn_task(self) -> tokio::task::JoinHandle<Result<(), Error>> {
        tokio::spawn(self.process_jobs())
    }
}
