use std::path::{Path, PathBuf};

use crate::error::RunError;
use crate::slurm::walltime::WallTime;

/// Extension assumed when the input is given without one
pub const DEFAULT_EXTENSION: &str = "inp";

/// The computation input named on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path as given (plus the default extension if it had none)
    pub path: PathBuf,
    /// File name, e.g. `water.inp`
    pub name: String,
    /// File name without its extension, e.g. `water`
    pub stem: String,
}

impl InputFile {
    pub fn new(arg: &str) -> Result<InputFile, RunError> {
        let mut path = PathBuf::from(arg);
        if path.extension().is_none() {
            path.set_extension(DEFAULT_EXTENSION);
        }

        let name = file_name(&path).ok_or_else(|| RunError::Usage(format!("'{arg}' is not a file name")))?;
        let stem = match name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => name.clone(),
        };

        Ok(InputFile { path, name, stem })
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

/// A fully resolved and validated submission
///
/// Only built by the option resolver once every value has been checked against the live limits of
/// the chosen partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub input: InputFile,
    pub partition: String,
    pub nodes: u32,
    pub time: WallTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_with_extension() {
        let input = InputFile::new("water.inp").unwrap();
        assert_eq!(input.name, "water.inp");
        assert_eq!(input.stem, "water");
        assert_eq!(input.path, PathBuf::from("water.inp"));
    }

    #[test]
    fn test_input_without_extension() {
        let input = InputFile::new("water").unwrap();
        assert_eq!(input.name, "water.inp");
        assert_eq!(input.stem, "water");
    }

    #[test]
    fn test_input_with_other_extension() {
        let input = InputFile::new("runs/benzene.opt.in").unwrap();
        assert_eq!(input.name, "benzene.opt.in");
        assert_eq!(input.stem, "benzene.opt");
    }

    #[test]
    fn test_input_not_a_file_name() {
        assert!(InputFile::new("..").unwrap_err().is_usage());
    }
}
