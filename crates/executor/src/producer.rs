use tokio::sync::mpsc::Sender;
use tracing::info;

use super::{
    error::Error,
    types::{CalculationJob, JobSource},
};

/// Owns a job source and runs it on its own task.
pub struct Producer<S: JobSource> {
    source: S,
}

impl<S> Producer<S>
where
    S: JobSource,
{
    pub fn new(source: S) -> Self {
        Producer { source }
    }

    pub fn run(
        self,
        sender: Sender<Vec<CalculationJob>>,
    ) -> tokio::task::JoinHandle<Result<(), Error>> {
        info!("Producer ready.");
        tokio::spawn(async move { self.source.run_stream(sender).await })
    }
}
