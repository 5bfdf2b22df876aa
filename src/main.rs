use std::process;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;

use crate::config::{Args, Config};
use crate::error::RunError;
use crate::launch::launch;
use crate::request::prompt::Terminal;
use crate::slurm::scheduler::SlurmCli;

mod config;
mod error;
mod launch;
mod request;
mod slurm;
mod workspace;

/// Exit status for every run that didn't submit, `--help` included
const FAILURE: i32 = 1;

fn main() {
    // --help and bad flags both end the run without submitting anything
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(FAILURE);
        }
    };

    let level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(err) = run(&args) {
        let failure = Failure::from(&err);
        eprintln!("{}", failure.message);
        if failure.show_usage {
            eprintln!("{}", Args::command().render_usage());
        }
        process::exit(FAILURE);
    }
}

/// What the user sees when a run fails
struct Failure {
    message: String,
    /// Usage errors are followed by the usage line
    show_usage: bool,
}

impl From<&anyhow::Error> for Failure {
    fn from(err: &anyhow::Error) -> Failure {
        Failure {
            message: format!("error: {err:#}"),
            show_usage: err.downcast_ref::<RunError>().map_or(false, RunError::is_usage),
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::from_args(args)?;
    info!("Staging under {} from {}", config.scratch_root.display(), config.invoking_dir.display());

    let launched = launch(&args.options(), &config, &SlurmCli::default(), &mut Terminal)
        .context("job not submitted")?;

    match launched.submission {
        Some(submission) => println!("{}", submission.reply),
        None => println!("{}", launched.script.path.display()),
    }
    Ok(())
}
