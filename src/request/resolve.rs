use log::info;

use crate::error::RunError;
use crate::request::job::{InputFile, JobRequest};
use crate::request::prompt::Prompt;
use crate::slurm::partition::{NodeRange, Partition};
use crate::slurm::scheduler::Scheduler;
use crate::slurm::walltime::{format_slurm, WallTime, FLOOR_SECS};

/// Raw, unvalidated options as they came off the command line
#[derive(Debug, Default, Clone)]
pub struct Options {
    pub input: Option<String>,
    pub queue: Option<String>,
    pub nodes: Option<String>,
    pub time: Option<String>,
    /// Ask for queue, nodes and time even when they were given as flags
    pub manual: bool,
}

impl Options {
    fn flag<'a>(&self, value: &'a Option<String>) -> Option<&'a str> {
        match self.manual {
            true => None,
            false => value.as_deref(),
        }
    }
}

/// Turn raw options into a validated JobRequest, prompting for anything missing
///
/// Every value is checked against the limits the scheduler reports for the chosen partition. The
/// first invalid value ends resolution with an error naming the violated bound.
pub fn resolve(options: &Options, scheduler: &dyn Scheduler, prompt: &mut dyn Prompt) -> Result<JobRequest, RunError> {
    let input = match &options.input {
        Some(arg) => InputFile::new(arg)?,
        None => return Err(RunError::Usage("an input file is required".to_string())),
    };

    let partition = resolve_partition(options, scheduler, prompt)?;
    info!("Using queue {} (nodes {}, time limit {})", partition.name, partition.nodes, partition.time_limit);

    let nodes = resolve_nodes(options, &partition, prompt)?;
    let time = resolve_time(options, &partition, prompt)?;
    info!("Resolved {} nodes for {}", nodes, time);

    Ok(JobRequest { input, partition: partition.name, nodes, time })
}

fn resolve_partition(options: &Options, scheduler: &dyn Scheduler, prompt: &mut dyn Prompt) -> Result<Partition, RunError> {
    if let Some(name) = options.flag(&options.queue) {
        return scheduler
            .partition(name)?
            .ok_or_else(|| RunError::UnknownPartition { name: name.to_string() });
    }

    let partitions = scheduler.partitions()?;
    prompt.show(&partition_table(&partitions));
    let name = prompt.ask("Queue: ")?;

    partitions
        .into_iter()
        .find(|p| p.name == name)
        .ok_or(RunError::UnknownPartition { name })
}

fn resolve_nodes(options: &Options, partition: &Partition, prompt: &mut dyn Prompt) -> Result<u32, RunError> {
    let range = partition.nodes;
    if range.is_single_node() {
        if options.nodes.is_some() {
            info!("Queue {} only runs single node jobs, ignoring requested node count", partition.name);
        }
        return Ok(1);
    }

    let value = match options.flag(&options.nodes) {
        Some(value) => value.to_string(),
        None => prompt.ask(&format!("Number of nodes [{}-{}]: ", range.min, range.max_label()))?,
    };

    parse_node_count(&value, range)
}

/// Only plain digit strings are node counts: no sign, no whitespace, no unit
///
/// A digit string too large for `u32` is still a node count, just one no queue allows.
fn parse_node_count(value: &str, range: NodeRange) -> Result<u32, RunError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RunError::NodeCountFormat { value: value.to_string() });
    }
    match value.parse::<u32>() {
        Ok(nodes) if range.contains(nodes) => Ok(nodes),
        _ => Err(RunError::NodeCountRange { nodes: value.to_string(), min: range.min, max: range.max_label() }),
    }
}

fn resolve_time(options: &Options, partition: &Partition, prompt: &mut dyn Prompt) -> Result<WallTime, RunError> {
    let limit = partition.time_limit;
    if !limit.exceeds_floor() {
        if let Some(time) = &options.time {
            info!("Queue {} allows at most {}, ignoring --time {}", partition.name, limit, time);
        }
        return Ok(WallTime::floor());
    }

    let value = match options.flag(&options.time) {
        Some(value) => value.to_string(),
        None => prompt.ask(&format!("Wall-clock time [{}-{}]: ", format_slurm(FLOOR_SECS), limit))?,
    };

    let time = WallTime::parse(&value)?;
    if time.seconds() < FLOOR_SECS || !limit.allows(time.seconds()) {
        return Err(RunError::WallTimeRange {
            value: time.to_string(),
            min: format_slurm(FLOOR_SECS),
            max: limit.to_string(),
        });
    }
    Ok(time)
}

/// Render the queue listing shown before asking for a queue
fn partition_table(partitions: &[Partition]) -> String {
    let width = partitions.iter().map(|p| p.name.len()).max().unwrap_or(0).max("QUEUE".len());
    let mut table = format!("{:<width$}  {:<6}  {:<12}  {}", "QUEUE", "STATE", "NODES", "MAX TIME");
    for p in partitions {
        let marker = if p.default { "  (default)" } else { "" };
        table.push_str(&format!(
            "\n{:<width$}  {:<6}  {:<12}  {}{}",
            p.name,
            p.available,
            p.nodes.to_string(),
            p.time_limit,
            marker
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::prompt::scripted::Scripted;
    use crate::slurm::scheduler::fake::FakeScheduler;
    use crate::slurm::walltime::TimeLimit;

    fn scheduler() -> FakeScheduler {
        let mut debug = Partition::new("debug", NodeRange { min: 1, max: Some(8) }, TimeLimit::Limited(3600));
        debug.default = true;
        FakeScheduler::new(vec![
            debug,
            Partition::new("normal", NodeRange { min: 1, max: None }, TimeLimit::Limited(2 * 86400)),
            Partition::new("serial", NodeRange { min: 1, max: Some(1) }, TimeLimit::Limited(86400)),
            Partition::new("short", NodeRange { min: 2, max: Some(4) }, TimeLimit::Limited(1800)),
        ])
    }

    fn options(queue: &str, nodes: Option<&str>, time: Option<&str>) -> Options {
        Options {
            input: Some("input.inp".to_string()),
            queue: Some(queue.to_string()),
            nodes: nodes.map(str::to_string),
            time: time.map(str::to_string),
            manual: false,
        }
    }

    fn run(opts: &Options, answers: &[&str]) -> (Result<JobRequest, RunError>, Scripted) {
        let mut prompt = Scripted::new(answers);
        let result = resolve(opts, &scheduler(), &mut prompt);
        (result, prompt)
    }

    #[test]
    fn test_flags_only() {
        let (job, prompt) = run(&options("debug", Some("2"), Some("00:45:00")), &[]);
        let job = job.unwrap();
        assert_eq!(job.partition, "debug");
        assert_eq!(job.nodes, 2);
        assert_eq!(job.time.as_str(), "00:45:00");
        assert_eq!(job.input.name, "input.inp");
        assert!(prompt.questions.is_empty());
    }

    #[test]
    fn test_missing_input() {
        let mut opts = options("debug", Some("2"), Some("00:45:00"));
        opts.input = None;
        let (job, _) = run(&opts, &[]);
        assert!(job.unwrap_err().is_usage());
    }

    #[test]
    fn test_unknown_queue_flag() {
        let (job, _) = run(&options("gpu", Some("2"), Some("00:45:00")), &[]);
        assert!(matches!(job, Err(RunError::UnknownPartition { name }) if name == "gpu"));
    }

    #[test]
    fn test_node_count_range() {
        for (nodes, ok) in [("0", false), ("1", true), ("8", true), ("9", false), ("100", false)] {
            let (job, _) = run(&options("debug", Some(nodes), Some("00:45:00")), &[]);
            match (job, ok) {
                (Ok(job), true) => assert_eq!(job.nodes.to_string(), nodes),
                (Err(RunError::NodeCountRange { max, .. }), false) => assert_eq!(max, "8"),
                (other, _) => panic!("unexpected result for {nodes}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_node_count_minimum_above_one() {
        let (job, _) = run(&options("short", Some("1"), None), &[]);
        assert!(matches!(job, Err(RunError::NodeCountRange { nodes, min: 2, .. }) if nodes == "1"));
    }

    #[test]
    fn test_node_count_format() {
        for bad in ["-1", "two", "2.0", " 2", "+2", ""] {
            let (job, _) = run(&options("debug", Some(bad), Some("00:45:00")), &[]);
            assert!(matches!(job, Err(RunError::NodeCountFormat { .. })), "{bad:?}");
        }
    }

    #[test]
    fn test_node_count_too_large_for_any_queue() {
        for queue in ["debug", "normal"] {
            let (job, _) = run(&options(queue, Some("99999999999"), Some("01:00:00")), &[]);
            assert!(
                matches!(&job, Err(RunError::NodeCountRange { nodes, min: 1, .. }) if nodes == "99999999999"),
                "{queue}: {job:?}"
            );
        }
    }

    #[test]
    fn test_unbounded_nodes() {
        let (job, _) = run(&options("normal", Some("5000"), Some("1-00:00:00")), &[]);
        assert_eq!(job.unwrap().nodes, 5000);
    }

    #[test]
    fn test_single_node_queue_forces_one() {
        for requested in [None, Some("1"), Some("16"), Some("junk")] {
            let (job, prompt) = run(&options("serial", requested, Some("02:00:00")), &[]);
            assert_eq!(job.unwrap().nodes, 1);
            assert!(prompt.questions.is_empty());
        }
    }

    #[test]
    fn test_time_range() {
        for (time, ok) in [("00:29:59", false), ("00:30:00", true), ("01:00:00", true), ("01:00:01", false), ("1-00:00:00", false)] {
            let (job, _) = run(&options("debug", Some("1"), Some(time)), &[]);
            match (job, ok) {
                (Ok(job), true) => assert_eq!(job.time.as_str(), time),
                (Err(RunError::WallTimeRange { min, max, .. }), false) => {
                    assert_eq!(min, "00:30:00");
                    assert_eq!(max, "01:00:00");
                }
                (other, _) => panic!("unexpected result for {time}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_huge_day_count_is_out_of_range() {
        for (queue, time) in [("debug", "213503982334602-00:00:00"), ("normal", "213503982334602-00:00:00"), ("normal", "99999999999999999999-00:00:00")] {
            let (job, _) = run(&options(queue, Some("1"), Some(time)), &[]);
            assert!(
                matches!(&job, Err(RunError::WallTimeRange { value, .. }) if value == time),
                "{queue} {time}: {job:?}"
            );
        }
    }

    #[test]
    fn test_huge_day_count_on_unlimited_queue() {
        let scheduler = FakeScheduler::new(vec![Partition::new("long", NodeRange { min: 1, max: None }, TimeLimit::Unlimited)]);
        let opts = options("long", Some("1"), Some("213503982334602-00:00:00"));
        let result = resolve(&opts, &scheduler, &mut Scripted::default());
        assert!(matches!(result, Err(RunError::WallTimeRange { max, .. }) if max == "infinite"));
    }

    #[test]
    fn test_time_format() {
        let (job, _) = run(&options("debug", Some("1"), Some("45 minutes")), &[]);
        assert!(matches!(job, Err(RunError::WallTimeFormat { .. })));
    }

    #[test]
    fn test_short_queue_defaults_time() {
        // the requested time is ignored, even when it is malformed
        for requested in [None, Some("04:00:00"), Some("soon")] {
            let (job, prompt) = run(&options("short", Some("2"), requested), &[]);
            assert_eq!(job.unwrap().time.as_str(), "00:30:00");
            assert!(prompt.questions.is_empty());
        }
    }

    #[test]
    fn test_prompts_for_everything_missing() {
        let opts = Options { input: Some("water".to_string()), ..Default::default() };
        let (job, prompt) = run(&opts, &["normal", "4", "02:00:00"]);
        let job = job.unwrap();
        assert_eq!(job.input.name, "water.inp");
        assert_eq!(job.partition, "normal");
        assert_eq!(job.nodes, 4);
        assert_eq!(job.time.as_str(), "02:00:00");
        assert_eq!(
            prompt.questions,
            vec!["Queue: ", "Number of nodes [1-infinite]: ", "Wall-clock time [00:30:00-2-00:00:00]: "]
        );
        assert!(prompt.shown[0].contains("debug"));
        assert!(prompt.shown[0].contains("(default)"));
    }

    #[test]
    fn test_prompted_queue_must_be_listed() {
        let opts = Options { input: Some("water.inp".to_string()), ..Default::default() };
        let (job, _) = run(&opts, &["gpu"]);
        assert!(matches!(job, Err(RunError::UnknownPartition { name }) if name == "gpu"));
    }

    #[test]
    fn test_manual_ignores_flags() {
        let mut opts = options("debug", Some("2"), Some("00:45:00"));
        opts.manual = true;
        let (job, prompt) = run(&opts, &["normal", "3", "10:00:00"]);
        let job = job.unwrap();
        assert_eq!(job.partition, "normal");
        assert_eq!(job.nodes, 3);
        assert_eq!(job.time.as_str(), "10:00:00");
        assert_eq!(prompt.questions.len(), 3);
    }

    #[test]
    fn test_prompted_values_are_validated() {
        let opts = Options { input: Some("water.inp".to_string()), queue: Some("debug".to_string()), ..Default::default() };
        let (job, _) = run(&opts, &["12"]);
        assert!(matches!(job, Err(RunError::NodeCountRange { nodes, .. }) if nodes == "12"));
    }

    #[test]
    fn test_partition_table() {
        let table = partition_table(&scheduler().partitions);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("QUEUE"));
        assert!(lines[1].starts_with("debug") && lines[1].ends_with("(default)"));
        assert!(lines[2].contains("1-infinite"));
    }
}
