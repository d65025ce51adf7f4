//! Per-target and per-run outcome reporting

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Lifecycle of one target's scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    Bootstrapping,
    Fetching,
    Retrying,
    Done,
    Aborted,
}

impl TargetState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bootstrapping => "bootstrapping",
            Self::Fetching => "fetching",
            Self::Retrying => "retrying",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Counters for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub name: String,
    pub state: TargetState,
    pub pages_succeeded: u32,
    pub pages_dropped: u32,
    pub records: usize,
    /// Total listing count the API advertised, when any page reported one
    pub advertised_total: Option<u64>,
    /// Stopped early by a user interrupt
    pub interrupted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl TargetReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: TargetState::Bootstrapping,
            pages_succeeded: 0,
            pages_dropped: 0,
            records: 0,
            advertised_total: None,
            interrupted: false,
            abort_reason: None,
        }
    }
}

impl fmt::Display for TargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} | pages ok {} dropped {} | records {}",
            self.name, self.state, self.pages_succeeded, self.pages_dropped, self.records
        )?;
        if let Some(total) = self.advertised_total {
            write!(f, " of {}", total)?;
        }
        if self.interrupted {
            f.write_str(" | interrupted")?;
        }
        if let Some(reason) = &self.abort_reason {
            write!(f, " | {}", reason)?;
        }
        Ok(())
    }
}

/// Report and collected records of one target.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub report: TargetReport,
    pub records: Vec<Value>,
}

/// Summary of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
}

impl RunReport {
    pub fn total_records(&self) -> usize {
        self.targets.iter().map(|t| t.records).sum()
    }

    pub fn total_pages_dropped(&self) -> u32 {
        self.targets.iter().map(|t| t.pages_dropped).sum()
    }

    pub fn aborted(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.state == TargetState::Aborted)
            .count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for target in &self.targets {
            writeln!(f, "{}", target)?;
        }
        write!(
            f,
            "{} target(s), {} record(s), {} page(s) dropped, {} aborted in {}s",
            self.targets.len(),
            self.total_records(),
            self.total_pages_dropped(),
            self.aborted(),
            (self.finished_at - self.started_at).num_seconds()
        )
    }
}
