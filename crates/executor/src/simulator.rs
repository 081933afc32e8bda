use async_trait::async_trait;
use common::types::{Hypothesis, Variable};
use errprop_core::nominal_bindings;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info};

use super::error::Error;
use super::presets::PRESETS;
use super::types::{CalculationJob, JobMode, JobSource};

/// Nominal values are drawn from this multiple of the preset default.
const VALUE_SCALE: std::ops::RangeInclusive<f64> = 0.5..=2.0;

/// Bounds are drawn as this fraction of the drawn nominal value.
const RELATIVE_BOUND: std::ops::RangeInclusive<f64> = 0.001..=0.05;

/// Generates random calculations over the preset formulas.
///
/// Each job picks a preset, perturbs its default values, and is either a
/// direct calculation (validated half of the time) or an inverse one with a
/// random target and hypothesis. A fixed `seed` reproduces the same jobs.
pub struct SimulatorSource {
    pub total_jobs: usize,
    pub batch_size: usize,
    pub seed: Option<u64>,
}

fn random_job(rng: &mut SmallRng, index: usize) -> CalculationJob {
    let preset = &PRESETS[rng.random_range(0..PRESETS.len())];

    let variables: Vec<Variable> = preset
        .default_variables()
        .into_iter()
        .map(|v| {
            let value = v.value * rng.random_range(VALUE_SCALE);
            let bound = value.abs() * rng.random_range(RELATIVE_BOUND);
            Variable::new(v.name, value, bound)
        })
        .collect();

    let mode = if rng.random_bool(0.5) {
        JobMode::Direct {
            validate: rng.random_bool(0.5),
        }
    } else {
        let is_relative = rng.random_bool(0.5);
        let fraction = rng.random_range(RELATIVE_BOUND);
        let target = if is_relative {
            fraction
        } else {
            // Absolute targets are a fraction of |f| at the nominal point.
            let nominal = preset
                .expression()
                .eval_or_zero(&nominal_bindings(&variables));
            nominal.abs() * fraction
        };
        JobMode::Inverse {
            target,
            is_relative,
            hypothesis: Hypothesis::ALL[rng.random_range(0..Hypothesis::ALL.len())],
        }
    };

    CalculationJob {
        id: format!("sim-{}", index + 1),
        expression: preset.formula.to_string(),
        variables,
        mode,
    }
}

#[async_trait]
impl JobSource for SimulatorSource {
    /// Sends `total_jobs` generated jobs in batches of `batch_size`, then returns.
    ///
    /// Backpressure comes from awaiting `sender.send()`. Fails with
    /// `ChannelSendFailed` if the receiver is dropped first.
    async fn run_stream(self, sender: Sender<Vec<CalculationJob>>) -> Result<(), Error> {
        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let batch_size = self.batch_size.max(1);

        info!("Simulator: generating {} jobs...", self.total_jobs);

        let mut generated = 0;
        while generated < self.total_jobs {
            let count = batch_size.min(self.total_jobs - generated);
            let jobs: Vec<CalculationJob> = (generated..generated + count)
                .map(|index| random_job(&mut rng, index))
                .collect();
            generated += count;

            debug!("Simulator sent {} jobs.", jobs.len());
            if sender.send(jobs).await.is_err() {
                info!("Simulator shutting down: worker receiver dropped.");
                return Err(Error::ChannelSendFailed);
            }
        }

        info!("Simulator: done after {} jobs.", generated);
        Ok(())
    }
}
