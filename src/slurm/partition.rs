use std::fmt;

use log::warn;

use crate::error::RunError;
use crate::slurm::walltime::TimeLimit;

/// sinfo output format:
/// %P - Partition name, `*` marks the default
/// %a - Availability (up / down / drain / inact)
/// %s - Job size range in nodes (min-max)
/// %l - Time limit
pub const SINFO_FORMAT: &str = "%P|%a|%s|%l";

/// Node count bounds of a partition, `max` is `None` when unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRange {
    pub min: u32,
    pub max: Option<u32>,
}

impl NodeRange {
    pub fn contains(&self, nodes: u32) -> bool {
        nodes >= self.min && self.max.map_or(true, |max| nodes <= max)
    }

    /// Partitions that only ever run on one node don't need a node count
    pub fn is_single_node(&self) -> bool {
        self.max == Some(1)
    }

    pub fn max_label(&self) -> String {
        match self.max {
            Some(max) => max.to_string(),
            None => "infinite".to_string(),
        }
    }

    /// Parse a job size range as printed by `sinfo %s`: `1-infinite`, `2-8` or `4`
    fn parse(s: &str) -> Option<NodeRange> {
        let s = s.trim();
        match s.split_once('-') {
            Some((min, max)) => {
                let min = min.parse::<u32>().ok()?;
                let max = if max.eq_ignore_ascii_case("infinite") || max.eq_ignore_ascii_case("unlimited") {
                    None
                } else {
                    Some(max.parse::<u32>().ok()?)
                };
                Some(NodeRange { min, max })
            }
            None => {
                let n = s.parse::<u32>().ok()?;
                Some(NodeRange { min: n, max: Some(n) })
            }
        }
    }
}

impl fmt::Display for NodeRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max_label())
    }
}

/// A queue (Slurm partition) and the limits jobs submitted to it must respect
///
/// Read fresh from the scheduler on every run, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub name: String,
    pub default: bool,
    pub available: String,
    pub nodes: NodeRange,
    pub time_limit: TimeLimit,
}

impl Partition {
    pub fn new(name: &str, nodes: NodeRange, time_limit: TimeLimit) -> Partition {
        Partition {
            name: name.to_string(),
            default: false,
            available: "up".to_string(),
            nodes,
            time_limit,
        }
    }
}

/// Parse a single line of sinfo output
fn parse_sinfo_line(line: &str) -> Result<Partition, RunError> {
    let malformed = || RunError::SchedulerOutput { line: line.to_string() };

    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(malformed());
    }

    let (name, default) = match fields[0].strip_suffix('*') {
        Some(name) => (name, true),
        None => (fields[0], false),
    };
    if name.is_empty() {
        return Err(malformed());
    }

    let nodes = NodeRange::parse(fields[2]).ok_or_else(malformed)?;
    let time_limit = TimeLimit::parse(fields[3]).ok_or_else(malformed)?;

    let mut partition = Partition::new(name, nodes, time_limit);
    partition.default = default;
    partition.available = fields[1].to_string();
    Ok(partition)
}

/// Parse sinfo output into partitions, keeping the first row of each partition
///
/// sinfo prints one row per distinct combination of the requested fields, so a partition can
/// show up more than once. Rows that can't be parsed are logged and skipped.
pub fn parse_sinfo(stdout: &str) -> Vec<Partition> {
    let mut partitions: Vec<Partition> = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_sinfo_line(line) {
            Ok(partition) => {
                if !partitions.iter().any(|p| p.name == partition.name) {
                    partitions.push(partition);
                }
            }
            Err(e) => warn!("Skipping sinfo row: {}", e),
        }
    }

    partitions
}
