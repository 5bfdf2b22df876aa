//! Stage everything a job needs into a fresh directory on scratch

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RunError;
use crate::request::job::InputFile;

/// Lines like `restart previous.chk` name a checkpoint the computation resumes from
static RESTART: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^[ \t]*restart[ \t]+(\S+)").expect("valid regex"));

/// A per-submission directory under the scratch root
///
/// Named `<input name>.<run id>` and never cleaned up by this tool: once the job is submitted it
/// belongs to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    pub path: PathBuf,
}

impl WorkingDirectory {
    pub fn for_input(scratch_root: &Path, input: &InputFile, run_id: u32) -> WorkingDirectory {
        WorkingDirectory { path: scratch_root.join(format!("{}.{}", input.name, run_id)) }
    }

    fn create(&self) -> Result<(), RunError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| RunError::io(parent, e))?;
        }
        info!("Creating working directory {}", self.path.display());
        fs::create_dir(&self.path).map_err(|e| RunError::io(&self.path, e))
    }

    /// Copy a file into the directory, keeping its file name
    ///
    /// Staged files are never overwritten, so two sources sharing a file name fail the second copy.
    fn copy_in(&self, source: &Path) -> Result<PathBuf, RunError> {
        let name = source
            .file_name()
            .ok_or_else(|| RunError::Usage(format!("'{}' is not a file name", source.display())))?;
        let target = self.path.join(name);
        if target.exists() {
            let clash = io::Error::new(io::ErrorKind::AlreadyExists, format!("a staged file is already named {}", target.display()));
            return Err(RunError::io(source, clash));
        }
        info!("Copying {} to {}", source.display(), target.display());
        fs::copy(source, &target).map_err(|e| RunError::io(source, e))?;
        Ok(target)
    }
}

/// Create the working directory and copy the input plus every restart file it references
///
/// Files are looked up in `invoking_dir`. A missing input fails before anything is created; a
/// missing restart file fails after the directory and earlier copies already exist, and those are
/// left in place.
pub fn stage(input: &InputFile, invoking_dir: &Path, scratch_root: &Path, run_id: u32) -> Result<WorkingDirectory, RunError> {
    let source = invoking_dir.join(&input.path);
    if !source.is_file() {
        return Err(RunError::MissingInput { path: source });
    }

    let wd = WorkingDirectory::for_input(scratch_root, input, run_id);
    wd.create()?;
    wd.copy_in(&source)?;

    let text = fs::read_to_string(&source).map_err(|e| RunError::io(&source, e))?;
    for reference in restart_references(&text) {
        let restart = invoking_dir.join(&reference);
        if !restart.is_file() {
            warn!("Input {} references missing restart file {}", input.name, reference);
            return Err(RunError::MissingRestart { path: restart });
        }
        wd.copy_in(&restart)?;
    }

    Ok(wd)
}

/// File names following the restart keyword, in order of first appearance
pub fn restart_references(text: &str) -> Vec<String> {
    let mut references: Vec<String> = Vec::new();
    for caps in RESTART.captures_iter(text) {
        let name = caps[1].trim_matches(|c| c == '"' || c == '\'').to_string();
        if !name.is_empty() && !references.contains(&name) {
            references.push(name);
        }
    }
    references
}
