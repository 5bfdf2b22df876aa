//! Wall-clock durations as typed by users and as advertised by the scheduler

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RunError;

/// Shortest wall-clock time a job may request, in seconds (00:30:00)
pub const FLOOR_SECS: u64 = 30 * 60;

/// `[D-]HH:MM:SS`, the only shape accepted from users
static WALL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)-)?(\d{2}):([0-5]\d):([0-5]\d)$").expect("valid regex"));

/// A wall-clock time requested by the user
///
/// Keeps the text exactly as typed so it reaches the `#SBATCH --time` directive unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallTime {
    text: String,
    seconds: u64,
}

impl WallTime {
    pub fn parse(value: &str) -> Result<WallTime, RunError> {
        let value = value.trim();
        let caps = WALL_TIME
            .captures(value)
            .ok_or_else(|| RunError::WallTimeFormat { value: value.to_string() })?;

        // a matched field only fails to parse when it is too large, which is a duration no
        // queue can allow, so overflow saturates and the range check rejects it
        let field = |i: usize| -> Option<u64> {
            match caps.get(i) {
                Some(m) => m.as_str().parse::<u64>().ok(),
                None => Some(0),
            }
        };
        let seconds = [(1, 86400), (2, 3600), (3, 60), (4, 1)]
            .iter()
            .try_fold(0u64, |total, &(i, unit)| field(i)?.checked_mul(unit)?.checked_add(total))
            .unwrap_or(u64::MAX);

        Ok(WallTime { text: value.to_string(), seconds })
    }

    /// The 30 minute default used when a queue doesn't allow anything longer
    pub fn floor() -> WallTime {
        WallTime { text: format_slurm(FLOOR_SECS), seconds: FLOOR_SECS }
    }

    /// Length in seconds, `u64::MAX` when the typed value doesn't fit
    pub fn seconds(&self) -> u64 {
        self.seconds
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for WallTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Maximum run time of a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLimit {
    Limited(u64),
    Unlimited,
}

impl TimeLimit {
    /// Parse a limit as printed by `sinfo %l`
    ///
    /// Slurm prints `infinite` (or `UNLIMITED`) for unbounded partitions and otherwise one of
    /// `D-HH:MM:SS`, `D-HH:MM`, `D-HH`, `HH:MM:SS`, `MM:SS` or plain minutes.
    pub fn parse(s: &str) -> Option<TimeLimit> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("infinite") || s.eq_ignore_ascii_case("unlimited") {
            return Some(TimeLimit::Unlimited);
        }
        if s.is_empty() {
            return None;
        }

        let (days, rest) = match s.split_once('-') {
            Some((d, rest)) => (d.parse::<u64>().ok()?, Some(rest)),
            None => (0, None),
        };

        let seconds = match rest {
            // with a day prefix the fields are hours, minutes, seconds
            Some(rest) => {
                let parts = split_fields(rest)?;
                match parts.as_slice() {
                    [h] => to_seconds(*h, 0, 0)?,
                    [h, m] => to_seconds(*h, *m, 0)?,
                    [h, m, sec] => to_seconds(*h, *m, *sec)?,
                    _ => return None,
                }
            }
            // without one they are minutes, minutes:seconds, or hours:minutes:seconds
            None => {
                let parts = split_fields(s)?;
                match parts.as_slice() {
                    [m] => to_seconds(0, *m, 0)?,
                    [m, sec] => to_seconds(0, *m, *sec)?,
                    [h, m, sec] => to_seconds(*h, *m, *sec)?,
                    _ => return None,
                }
            }
        };

        Some(TimeLimit::Limited(days.checked_mul(86400)?.checked_add(seconds)?))
    }

    /// True when the partition allows jobs longer than the 30 minute floor
    pub fn exceeds_floor(&self) -> bool {
        match self {
            TimeLimit::Limited(secs) => *secs > FLOOR_SECS,
            TimeLimit::Unlimited => true,
        }
    }

    pub fn allows(&self, seconds: u64) -> bool {
        match self {
            TimeLimit::Limited(max) => seconds <= *max,
            // saturated durations never fit, not even an unlimited partition
            TimeLimit::Unlimited => seconds < u64::MAX,
        }
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TimeLimit::Limited(secs) => write!(f, "{}", format_slurm(*secs)),
            TimeLimit::Unlimited => write!(f, "infinite"),
        }
    }
}

fn to_seconds(hours: u64, mins: u64, secs: u64) -> Option<u64> {
    hours.checked_mul(3600)?.checked_add(mins.checked_mul(60)?)?.checked_add(secs)
}

fn split_fields(s: &str) -> Option<Vec<u64>> {
    s.split(':').map(|p| p.parse::<u64>().ok()).collect()
}

/// Format seconds as `[D-]HH:MM:SS`
pub fn format_slurm(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}
