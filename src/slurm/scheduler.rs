use std::path::Path;
use std::process::Command;

use log::info;

use crate::error::RunError;
use crate::slurm::partition::{parse_sinfo, Partition, SINFO_FORMAT};

/// What the scheduler printed after accepting a job script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub reply: String,
}

/// The narrow view of the workload manager this tool needs
///
/// Queries are live on every call. Implementations block until the scheduler answers.
pub trait Scheduler {
    /// Every partition the scheduler advertises
    fn partitions(&self) -> Result<Vec<Partition>, RunError>;

    /// Look up the limits of a single partition by name
    fn partition(&self, name: &str) -> Result<Option<Partition>, RunError> {
        Ok(self.partitions()?.into_iter().find(|p| p.name == name))
    }

    /// Hand a job script to the scheduler, running from `workdir`
    fn submit(&self, script: &Path, workdir: &Path) -> Result<Submission, RunError>;
}

/// Talks to Slurm through `sinfo` and `sbatch` on the PATH
pub struct SlurmCli {
    sinfo: String,
    sbatch: String,
}

impl Default for SlurmCli {
    fn default() -> Self {
        SlurmCli { sinfo: "sinfo".to_string(), sbatch: "sbatch".to_string() }
    }
}

impl SlurmCli {
    fn run_sinfo(&self, partition: Option<&str>) -> Result<Vec<Partition>, RunError> {
        let format = format!("--format={SINFO_FORMAT}");
        let mut cmd = Command::new(&self.sinfo);
        cmd.args(["--noheader", format.as_str()]);
        if let Some(name) = partition {
            cmd.arg(format!("--partition={name}"));
        }
        info!("Querying partitions: {:?}", &cmd);

        let output = cmd.output().map_err(|e| RunError::SchedulerQuery {
            command: self.sinfo.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::SchedulerQuery {
                command: self.sinfo.clone(),
                message: stderr.trim_end().to_string(),
            });
        }

        Ok(parse_sinfo(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Scheduler for SlurmCli {
    fn partitions(&self) -> Result<Vec<Partition>, RunError> {
        self.run_sinfo(None)
    }

    fn partition(&self, name: &str) -> Result<Option<Partition>, RunError> {
        Ok(self.run_sinfo(Some(name))?.into_iter().find(|p| p.name == name))
    }

    fn submit(&self, script: &Path, workdir: &Path) -> Result<Submission, RunError> {
        let mut sbatch = Command::new(&self.sbatch);
        let cmd = sbatch.arg(script).current_dir(workdir);
        info!("Running sbatch process {:?}", &cmd);

        let output = cmd.output().map_err(|e| RunError::SchedulerQuery {
            command: self.sbatch.clone(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::Submission { message: stderr.trim_end().to_string() });
        }

        Ok(Submission { reply: String::from_utf8_lossy(&output.stdout).trim_end().to_string() })
    }
}
