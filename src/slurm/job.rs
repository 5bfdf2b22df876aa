use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;
use serde::Serialize;
use tinytemplate::TinyTemplate;

use crate::error::RunError;
use crate::request::job::JobRequest;
use crate::workspace::WorkingDirectory;

/// Tasks launched on every node
pub const TASKS_PER_NODE: u32 = 4;
/// CPUs given to every task, also the OpenMP thread count
pub const CPUS_PER_TASK: u32 = 16;
pub const GPUS_PER_NODE: u32 = 4;
pub const CPU_BIND: &str = "cores";

/// Site settings that end up in the job script but aren't part of the request
#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub account: String,
    pub binary: String,
}

/// A JobPath is the path to a job script that's submitted to SLURM via sbatch
///
/// The script expects the staged input (and any restart files) next to it in the same working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPath {
    pub path: PathBuf,
}

/// All rendered sections of a job script
pub struct JobTemplate {
    header: Header,
    vars: EnvVars,
    launch: Launch,
}

impl JobTemplate {
    /// Render the job script for a resolved request
    ///
    /// No filesystem or process state is touched, the same arguments always give the same text.
    pub fn render(job: &JobRequest, settings: &ScriptSettings, rendered_at: DateTime<Local>) -> Result<JobTemplate, RunError> {
        Ok(JobTemplate {
            header: render_header(job, settings, rendered_at)?,
            vars: read_environment_variables(),
            launch: render_launch(job, settings)?,
        })
    }

    pub fn content(&self) -> String {
        // order is important
        [self.header.content.as_str(), self.vars.content.as_str(), self.launch.content.as_str()].concat()
    }

    /// Write the script into the working directory as `<stem>.job.<run id>`
    pub fn write(&self, wd: &WorkingDirectory, job: &JobRequest, run_id: u32) -> Result<JobPath, RunError> {
        let path = wd.path.join(format!("{}.job.{}", job.input.stem, run_id));
        info!("Writing job script to {}", path.display());
        write_new(&path, &self.content()).map_err(|e| RunError::io(&path, e))?;
        Ok(JobPath { path })
    }
}

fn write_new(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content.as_bytes())
}

/// Rendered SBATCH header
///
/// Job name, account, time, nodes and partition come from the request and site settings. Task,
/// CPU and GPU layout per node is fixed.
struct Header {
    content: String,
}

/// Static environment setup: GPU kernel cache, OpenMP threads and stack size
struct EnvVars {
    content: String,
}

/// Rendered job list and the parallel launch of the computation
struct Launch {
    content: String,
}

/// Rendering context for header
#[derive(Serialize)]
struct HeaderContext<'a> {
    name: &'a str,
    account: &'a str,
    time: &'a str,
    nodes: u32,
    partition: &'a str,
    tasks_per_node: u32,
    cpus_per_task: u32,
    gpus_per_node: u32,
    rendered_at: String,
}

/// Rendering context for launch
#[derive(Serialize)]
struct LaunchContext<'a> {
    input: &'a str,
    binary: &'a str,
    cpu_bind: &'a str,
    output: String,
}

fn template_engine<'a>(name: &'a str, text: &'a str) -> Result<TinyTemplate<'a>, RunError> {
    let mut tt = TinyTemplate::new();
    // job scripts are shell, not HTML
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template(name, text)?;
    Ok(tt)
}

/// Render the SBATCH header using TinyTemplate
fn render_header(job: &JobRequest, settings: &ScriptSettings, rendered_at: DateTime<Local>) -> Result<Header, RunError> {
    static HEADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/header.txt"));
    let tt = template_engine("header", HEADER)?;

    let context = HeaderContext {
        name: &job.input.stem,
        account: &settings.account,
        time: job.time.as_str(),
        nodes: job.nodes,
        partition: &job.partition,
        tasks_per_node: TASKS_PER_NODE,
        cpus_per_task: CPUS_PER_TASK,
        gpus_per_node: GPUS_PER_NODE,
        rendered_at: rendered_at.format("%Y-%m-%d %H:%M:%S %z").to_string(),
    };

    Ok(Header { content: tt.render("header", &context)? })
}

/// Read environment variables from template, everything is static
fn read_environment_variables() -> EnvVars {
    static ENV_VARS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/env_vars.txt"));
    EnvVars { content: ENV_VARS.to_string() }
}

/// Render the launch commands using TinyTemplate
fn render_launch(job: &JobRequest, settings: &ScriptSettings) -> Result<Launch, RunError> {
    static LAUNCH: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/launch.txt"));
    let tt = template_engine("launch", LAUNCH)?;

    let context = LaunchContext {
        input: &job.input.name,
        binary: &settings.binary,
        cpu_bind: CPU_BIND,
        output: format!("{}.out", job.input.stem),
    };

    Ok(Launch { content: tt.render("launch", &context)? })
}
