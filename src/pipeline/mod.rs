//! The pipeline engine.
//!
//! A run is an ordered list of named steps executed strictly in sequence:
//! trigger, checkout, provision, install, generate, publish. The first
//! failure stops the run and the remaining steps are recorded as not
//! reached. A step can also halt the run without failing it, which is how
//! a push to a non-triggering branch ends.

pub mod checkout;
pub mod generate;
pub mod install;
pub mod provision;
pub mod publish;
pub mod report;
pub mod trigger;

use crate::{config::PipelineConfig, log, utils::git};
use anyhow::{Context, Result};
use chrono::Utc;
use provision::PythonEnv;
use report::{RunOutcome, RunReport, StepReport, StepStatus};
use std::{fs, path::PathBuf, time::Instant};

/// What a step reports back when it succeeds.
#[derive(Debug)]
pub enum StepOutcome {
    /// The step did its work.
    Completed,
    /// Nothing to do; the desired state already held.
    Unchanged,
    /// Stop the run here, successfully, with a reason.
    SkipRun(String),
}

/// State threaded through the steps of one run.
pub struct PipelineContext {
    pub config: &'static PipelineConfig,
    /// Directory the pipeline operates on: the cached checkout for remote
    /// runs, the project root otherwise.
    pub workdir: PathBuf,
    /// Branch the run was triggered for, once resolved.
    pub event_ref: Option<String>,
    /// Short revision of the source work tree, once known.
    pub revision: Option<String>,
    /// Virtualenv handle, set by the provision step.
    pub python: Option<PythonEnv>,
    /// Resolve and log everything, but commit and push nothing.
    pub dry_run: bool,
}

impl PipelineContext {
    fn new(config: &'static PipelineConfig, workdir: PathBuf) -> Self {
        Self {
            config,
            workdir,
            event_ref: None,
            revision: None,
            python: None,
            dry_run: false,
        }
    }
}

/// A named pipeline step.
pub struct Step {
    name: &'static str,
    run: fn(&mut PipelineContext) -> Result<StepOutcome>,
}

impl Step {
    const fn new(name: &'static str, run: fn(&mut PipelineContext) -> Result<StepOutcome>) -> Self {
        Self { name, run }
    }
}

/// Options for a full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub event_ref: Option<String>,
    pub fresh: bool,
    pub dry_run: bool,
}

/// Run the full pipeline for one push event.
pub fn run(config: &'static PipelineConfig, opts: RunOptions) -> Result<()> {
    if opts.fresh {
        clear_dirs(&[config.venv_dir(), config.checkout_dir()])?;
    }

    // A remote run without an explicit ref cannot know the branch until the
    // clone exists, so the trigger check follows the checkout there.
    let trigger_after_checkout = config.checkout.url.is_some() && opts.event_ref.is_none();

    let mut steps = Vec::with_capacity(6);
    if trigger_after_checkout {
        steps.push(Step::new("checkout", checkout::run));
        steps.push(Step::new("trigger", trigger::run));
    } else {
        steps.push(Step::new("trigger", trigger::run));
        steps.push(Step::new("checkout", checkout::run));
    }
    steps.push(Step::new("provision", provision::run));
    steps.push(Step::new("install", install::run));
    steps.push(Step::new("generate", generate::run));
    steps.push(Step::new("publish", publish::run));

    let mut ctx = PipelineContext::new(config, config.workdir());
    ctx.event_ref = opts.event_ref;
    ctx.dry_run = opts.dry_run;

    run_steps(&mut ctx, steps, "run")
}

/// Build the docs against the local work tree, without publishing.
pub fn build(config: &'static PipelineConfig, fresh: bool) -> Result<()> {
    if fresh {
        clear_dirs(&[config.venv_dir()])?;
    }

    let steps = vec![
        Step::new("provision", provision::run),
        Step::new("install", install::run),
        Step::new("generate", generate::run),
    ];

    let mut ctx = PipelineContext::new(config, config.get_root().to_path_buf());
    run_steps(&mut ctx, steps, "build")
}

/// Publish the existing build output without rebuilding it.
pub fn publish_artifact(config: &'static PipelineConfig) -> Result<()> {
    let mut ctx = PipelineContext::new(config, config.workdir());

    // Best effort: pick up the source revision for the commit message
    if let Ok(repo) = git::open_repo(&ctx.workdir)
        && let Ok(Some(revision)) = git::head_revision(&repo)
    {
        ctx.revision = Some(short_hex(&revision));
    }

    let steps = vec![Step::new("publish", publish::run)];
    run_steps(&mut ctx, steps, "publish")
}

/// Execute steps in order, record each one, stop at the first failure or
/// halt. The record is written even for failed runs.
fn run_steps(ctx: &mut PipelineContext, steps: Vec<Step>, command: &str) -> Result<()> {
    let started_at = Utc::now();
    let mut records: Vec<StepReport> = Vec::with_capacity(steps.len());
    let mut outcome = RunOutcome::Completed;
    let mut failure: Option<anyhow::Error> = None;

    let mut steps = steps.into_iter();
    for step in steps.by_ref() {
        let start = Instant::now();
        let result = (step.run)(ctx);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(StepOutcome::Completed) => records.push(StepReport {
                name: step.name.into(),
                status: StepStatus::Completed,
                duration_ms,
                detail: None,
            }),
            Ok(StepOutcome::Unchanged) => records.push(StepReport {
                name: step.name.into(),
                status: StepStatus::Unchanged,
                duration_ms,
                detail: None,
            }),
            Ok(StepOutcome::SkipRun(reason)) => {
                log!(step.name; "{reason}");
                records.push(StepReport {
                    name: step.name.into(),
                    status: StepStatus::Skipped,
                    duration_ms,
                    detail: Some(reason),
                });
                outcome = RunOutcome::Skipped;
                break;
            }
            Err(err) => {
                records.push(StepReport {
                    name: step.name.into(),
                    status: StepStatus::Failed,
                    duration_ms,
                    detail: Some(format!("{err:#}")),
                });
                outcome = RunOutcome::Failed;
                failure = Some(err.context(format!("step `{}` failed", step.name)));
                break;
            }
        }
    }

    for step in steps {
        records.push(StepReport {
            name: step.name.into(),
            status: StepStatus::NotReached,
            duration_ms: 0,
            detail: None,
        });
    }

    let finished_at = Utc::now();
    let elapsed = (finished_at - started_at).num_milliseconds().max(0) as u64;

    let record = RunReport {
        command: command.into(),
        started_at,
        finished_at,
        event_ref: ctx.event_ref.clone(),
        revision: ctx.revision.clone(),
        outcome,
        steps: records,
    };
    if let Err(err) = record.write(ctx.config) {
        log!("error"; "could not write run record: {err:#}");
    }

    if let Some(err) = failure {
        return Err(err);
    }
    if outcome == RunOutcome::Completed {
        log!(command; "finished in {}", report::fmt_duration(elapsed));
    }
    Ok(())
}

/// Seven-digit hex form of an object id, as git prints it.
pub fn short_hex(id: &gix::ObjectId) -> String {
    id.to_hex_with_len(7).to_string()
}

fn clear_dirs(dirs: &[PathBuf]) -> Result<()> {
    for dir in dirs {
        if dir.exists() {
            log!("run"; "removing {}", dir.display());
            fs::remove_dir_all(dir)
                .with_context(|| format!("Failed to remove `{}`", dir.display()))?;
        }
    }
    Ok(())
}
