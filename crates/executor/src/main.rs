pub mod config;
pub mod csv_source;
pub mod error;
pub mod format;
pub mod grading;
pub mod presets;
pub mod producer;
pub mod report;
pub mod simulator;
pub mod types;
pub mod worker;
pub mod writer;

use clap::{Args, Parser, Subcommand};
use common::types::{Hypothesis, Variable};
use errprop_core::{Expression, Propagator};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use csv_source::CsvJobSource;
use error::Error;
use format::{DecimalLocale, parse_variable_item, try_parse_number};
use producer::Producer;
use simulator::SimulatorSource;
use types::{CalculationJob, JobMode, JobOutcome, JobResult, JobSource};
use worker::{Worker, run_job};
use writer::{ExportWriter, ResultWriter};

#[derive(Parser)]
#[command(name = "errprop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "First-order propagation of measurement error bounds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (default: crates/executor/Config.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Decimal separator used to read and print numbers
    #[arg(long, global = true, value_enum)]
    locale: Option<DecimalLocale>,

    /// Fixed number of printed fraction digits
    #[arg(long, global = true)]
    decimals: Option<usize>,

    /// Seed for random corner sampling and the simulator
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Args)]
struct ProblemArgs {
    /// Expression in the variables, e.g. "V/I"
    #[arg(short, long)]
    expr: String,

    /// Variable as NAME=VALUE±BOUND (or NAME=VALUE+-BOUND); repeatable.
    /// Inferred at 1 ± 0.1 when omitted.
    #[arg(short, long = "var", value_name = "NAME=VALUE±BOUND")]
    vars: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Propagate input bounds to the result (direct method)
    Direct {
        #[command(flatten)]
        problem: ProblemArgs,

        /// Also check the estimate against the corners of the error box
        #[arg(long)]
        validate: bool,

        /// Append the calculation to a CSV export, creating it with a header
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Allocate an output error budget to the inputs (inverse method)
    Inverse {
        #[command(flatten)]
        problem: ProblemArgs,

        /// Allowed output error
        #[arg(long)]
        target: String,

        /// Read the target as a fraction of |f|
        #[arg(long)]
        relative: bool,

        /// Allocation rule: H1, H2 or H3
        #[arg(long, default_value = "H1")]
        hypothesis: Hypothesis,

        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Compare the linear interval with the function at the box corners
    Validate {
        #[command(flatten)]
        problem: ProblemArgs,
    },

    /// Run a built-in formula at its default values; lists presets without a name
    Preset { name: Option<String> },

    /// Run many calculations through the async pipeline
    Batch {
        #[command(subcommand)]
        source: BatchSource,
    },

    /// Check an answer to a practice exercise
    Grade {
        /// JSON file with an array of exercises
        #[arg(long, value_name = "FILE")]
        exercises: PathBuf,

        #[arg(long)]
        id: String,

        #[arg(long)]
        answer: String,
    },
}

#[derive(Subcommand)]
enum BatchSource {
    /// Jobs from a CSV file
    Csv {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Randomly generated preset jobs
    Sim {
        #[arg(long, default_value_t = 100)]
        jobs: usize,

        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("executor=info,errprop_core=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Error> {
    let mut config = config::load_config(cli.config.as_deref())?;
    if let Some(locale) = cli.locale {
        config.format.locale = locale;
    }
    if cli.decimals.is_some() {
        config.format.decimals = cli.decimals;
    }
    if cli.seed.is_some() {
        config.engine.seed = cli.seed;
    }

    let propagator = Propagator::new(config.engine.propagator_options());

    match cli.command {
        Command::Direct {
            problem,
            validate,
            export,
        } => {
            let job = build_job(&problem, JobMode::Direct { validate }, config.format.locale)?;
            let outcome = run_job(&propagator, &job);
            if let JobResult::Direct { result, validation } = &outcome.result {
                print!("{}", report::render_direct(result, validation.as_ref(), &config.format));
            }
            export_outcome(export.as_deref(), outcome)?;
        }

        Command::Inverse {
            problem,
            target,
            relative,
            hypothesis,
            export,
        } => {
            let target = try_parse_number(&target, config.format.locale)
                .ok_or_else(|| Error::InvalidInput(format!("invalid target '{}'", target)))?;
            let mode = JobMode::Inverse {
                target,
                is_relative: relative,
                hypothesis,
            };
            let job = build_job(&problem, mode, config.format.locale)?;
            let outcome = run_job(&propagator, &job);
            if let JobResult::Inverse(result) = &outcome.result {
                print!("{}", report::render_inverse(result, &config.format));
            }
            export_outcome(export.as_deref(), outcome)?;
        }

        Command::Validate { problem } => {
            let job = build_job(&problem, JobMode::Direct { validate: true }, config.format.locale)?;
            let expression = Expression::parse(&job.expression);
            let (direct, validation) = propagator.direct_and_validate(&expression, &job.variables);
            let num = |v: f64| format::format_auto(v, config.format.locale, config.format.decimals);

            println!(
                "predicted  = [{}; {}]",
                num(direct.interval.lower),
                num(direct.interval.upper)
            );
            println!("sampled    = [{}; {}]", num(validation.min), num(validation.max));
            println!("samples    = {}", validation.samples_used);
            println!("coherent   = {}", validation.is_coherent);
        }

        Command::Preset { name: None } => {
            for preset in &presets::PRESETS {
                println!(
                    "{:<12} {:<8} {:<14} {}",
                    preset.slug, preset.key, preset.formula, preset.description
                );
            }
        }

        Command::Preset { name: Some(name) } => {
            let preset = presets::find(&name)
                .ok_or_else(|| Error::InvalidInput(format!("unknown preset '{}'", name)))?;
            let variables = preset.default_variables();
            let (direct, validation) =
                propagator.direct_and_validate(&preset.expression(), &variables);

            println!("{}: {}   ({})", preset.description, preset.latex, preset.formula);
            for v in &variables {
                println!(
                    "  {} = {} ± {}",
                    v.name,
                    format::format_number(v.value, config.format.locale, None),
                    format::format_number(v.absolute_error, config.format.locale, None)
                );
            }
            println!();
            print!("{}", report::render_direct(&direct, Some(&validation), &config.format));
        }

        Command::Batch { source } => match source {
            BatchSource::Csv { file, out } => {
                let source = CsvJobSource::new(file, config.batch.batch_size, config.format.locale);
                run_pipeline(source, propagator, &config, out).await?;
            }
            BatchSource::Sim { jobs, out } => {
                let source = SimulatorSource {
                    total_jobs: jobs,
                    batch_size: config.batch.batch_size,
                    seed: config.engine.seed,
                };
                run_pipeline(source, propagator, &config, out).await?;
            }
        },

        Command::Grade {
            exercises,
            id,
            answer,
        } => {
            let bank = grading::load_exercises(&exercises)?;
            let exercise = bank
                .iter()
                .find(|e| e.id == id)
                .ok_or_else(|| Error::InvalidInput(format!("no exercise with id '{}'", id)))?;
            let verdict = grading::grade_text(&answer, exercise, config.format.locale);
            let num = |v: f64| format::format_number(v, config.format.locale, None);

            println!("{}", exercise.statement);
            println!();
            if verdict.correct {
                println!("Correct.");
            } else {
                println!(
                    "Incorrect. Expected {} (±{}).",
                    num(exercise.answer),
                    num(exercise.tolerance)
                );
            }
            println!("Relative error: {}%", num(verdict.relative_error_percent));
            if !exercise.solution.is_empty() {
                println!();
                for step in &exercise.solution {
                    println!("  {}", step);
                }
            }
        }
    }

    Ok(())
}

/// Turns CLI arguments into a job, failing on a malformed expression.
fn build_job(
    problem: &ProblemArgs,
    mode: JobMode,
    locale: DecimalLocale,
) -> Result<CalculationJob, Error> {
    let expression = Expression::parse(&problem.expr);
    if let Some(e) = expression.error() {
        return Err(Error::Expression(e.clone()));
    }

    let variables: Vec<Variable> = if problem.vars.is_empty() {
        let inferred = presets::infer_variables(&expression);
        info!(
            "no variables given, using {} at nominal 1 ± 0.1",
            inferred.len()
        );
        inferred
    } else {
        problem
            .vars
            .iter()
            .map(|item| parse_variable_item(item, locale))
            .collect::<Result<_, _>>()?
    };

    Ok(CalculationJob {
        id: "cli".to_string(),
        expression: problem.expr.clone(),
        variables,
        mode,
    })
}

fn export_outcome(path: Option<&Path>, outcome: JobOutcome) -> Result<(), Error> {
    if let Some(path) = path {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut export = if file.metadata()?.len() == 0 {
            ExportWriter::new(file)?
        } else {
            ExportWriter::continuing(file)
        };
        export.write_outcomes(&[outcome])?;
        info!("exported to {}", path.display());
    }
    Ok(())
}

fn join_result(
    stage: &str,
    result: Result<Result<(), Error>, tokio::task::JoinError>,
) -> Result<(), Error> {
    result.map_err(|e| Error::TaskFailed(format!("{} task: {}", stage, e)))?
}

/// Source → worker → writer, each on its own task over bounded channels.
async fn run_pipeline<S: JobSource>(
    source: S,
    propagator: Propagator,
    config: &Config,
    out: PathBuf,
) -> Result<(), Error> {
    let buffer_size = config.batch.buffer_size.max(1);
    let (job_sender, job_receiver) = mpsc::channel::<Vec<CalculationJob>>(buffer_size);
    let (outcome_sender, outcome_receiver) = mpsc::channel::<Vec<JobOutcome>>(buffer_size);

    let producer_handle = Producer::new(source).run(job_sender);
    let worker_handle = Worker::new(propagator, job_receiver, outcome_sender).spawn_task();
    let writer_handle = ResultWriter::new(&out, outcome_receiver).spawn_task();

    let (producer, worker, writer) = tokio::join!(producer_handle, worker_handle, writer_handle);

    // The writer's own error explains a producer or worker send failure.
    join_result("writer", writer)?;
    join_result("producer", producer)?;
    join_result("worker", worker)?;

    info!("Pipeline shut down. Results in {}", out.display());
    Ok(())
}
