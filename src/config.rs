//! Command line and environment configuration

use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::error::RunError;
use crate::request::resolve::Options;
use crate::slurm::job::ScriptSettings;

/// Computation binary launched by the job script unless overridden
pub const DEFAULT_BINARY: &str = "qcx";

#[derive(Parser, Debug)]
#[command(name = "runjob")]
#[command(about = "Stage an input on scratch and submit it as a Slurm job")]
pub struct Args {
    /// Input file, `.inp` is assumed when no extension is given
    pub input: Option<String>,

    /// Ask for queue, nodes and time interactively, ignoring the flags
    #[arg(short, long)]
    pub manual: bool,

    /// Queue (Slurm partition) to submit to
    #[arg(short, long)]
    pub queue: Option<String>,

    /// Number of nodes
    #[arg(short, long)]
    pub nodes: Option<String>,

    /// Wall-clock time limit, [D-]HH:MM:SS
    #[arg(short, long)]
    pub time: Option<String>,

    /// Account charged for the job
    #[arg(short = 'A', long, env = "SBATCH_ACCOUNT")]
    pub account: Option<String>,

    /// Directory working directories are created under
    #[arg(long, env = "SCRATCH")]
    pub scratch: Option<PathBuf>,

    /// Computation binary started on every task
    #[arg(long, env = "RUNJOB_BINARY", default_value = DEFAULT_BINARY)]
    pub binary: String,

    /// Stage and render the job script but don't submit it
    #[arg(long)]
    pub dry_run: bool,

    /// Log every step
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn options(&self) -> Options {
        Options {
            input: self.input.clone(),
            queue: self.queue.clone(),
            nodes: self.nodes.clone(),
            time: self.time.clone(),
            manual: self.manual,
        }
    }
}

/// Settings that shape where and how a job is staged, independent of the request itself
#[derive(Debug, Clone)]
pub struct Config {
    pub scratch_root: PathBuf,
    /// Where the input and restart files are looked up
    pub invoking_dir: PathBuf,
    pub settings: ScriptSettings,
    pub dry_run: bool,
    /// Makes working directory and job script names unique per invocation
    pub run_id: u32,
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Config, RunError> {
        Config::new(args, invoking_dir()?, std::process::id())
    }

    fn new(args: &Args, invoking_dir: PathBuf, run_id: u32) -> Result<Config, RunError> {
        let scratch_root = args
            .scratch
            .clone()
            .ok_or_else(|| RunError::Usage("no scratch directory, set SCRATCH or pass --scratch".to_string()))?;
        let account = args
            .account
            .clone()
            .filter(|a| !a.is_empty())
            .ok_or_else(|| RunError::Usage("no account, set SBATCH_ACCOUNT or pass --account".to_string()))?;

        Ok(Config {
            scratch_root,
            invoking_dir,
            settings: ScriptSettings { account, binary: args.binary.clone() },
            dry_run: args.dry_run,
            run_id,
        })
    }
}

/// The shell's PWD keeps symlinked paths intact, fall back to the process directory without it
fn invoking_dir() -> Result<PathBuf, RunError> {
    match env::var_os("PWD") {
        Some(pwd) if !pwd.is_empty() => Ok(PathBuf::from(pwd)),
        _ => env::current_dir().map_err(|e| RunError::io(".", e)),
    }
}
