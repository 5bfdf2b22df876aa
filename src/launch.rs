//! Resolve, stage, render and submit: one pass, stopping at the first error

use chrono::Local;
use log::info;

use crate::config::Config;
use crate::error::RunError;
use crate::request::prompt::Prompt;
use crate::request::resolve::{resolve, Options};
use crate::slurm::job::{JobPath, JobTemplate};
use crate::slurm::scheduler::{Scheduler, Submission};
use crate::workspace::stage;

/// What a successful run produced
#[derive(Debug)]
pub struct Launched {
    pub script: JobPath,
    /// `None` on a dry run
    pub submission: Option<Submission>,
}

pub fn launch(options: &Options, config: &Config, scheduler: &dyn Scheduler, prompt: &mut dyn Prompt) -> Result<Launched, RunError> {
    let job = resolve(options, scheduler, prompt)?;

    let wd = stage(&job.input, &config.invoking_dir, &config.scratch_root, config.run_id)?;

    let template = JobTemplate::render(&job, &config.settings, Local::now())?;
    let script = template.write(&wd, &job, config.run_id)?;

    if config.dry_run {
        info!("--dry-run set, not submitting {}", script.path.display());
        return Ok(Launched { script, submission: None });
    }

    let submission = scheduler.submit(&script.path, &wd.path)?;
    Ok(Launched { script, submission: Some(submission) })
}
