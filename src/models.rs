use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tri-state outcome of one homework for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acceptance {
    Accepted,
    NotAccepted,
    NoSubmission,
}

impl Acceptance {
    /// Parses a raw spreadsheet cell. Numeric zero means not accepted and any
    /// other number means accepted; a short token vocabulary covers textual
    /// gradebooks; everything else (including an empty cell) is no submission.
    pub fn parse_cell(raw: &str) -> Acceptance {
        let text = raw.trim().to_lowercase();
        if text.is_empty() {
            return Acceptance::NoSubmission;
        }
        if let Ok(value) = text.parse::<f64>() {
            if value == 0.0 {
                return Acceptance::NotAccepted;
            }
            return Acceptance::Accepted;
        }
        match text.as_str() {
            "ok" | "yes" | "passed" | "accepted" => Acceptance::Accepted,
            "no" | "fail" | "failed" | "rejected" => Acceptance::NotAccepted,
            _ => Acceptance::NoSubmission,
        }
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, Acceptance::Accepted)
    }
}

/// Performance tier assigned upstream. The engine treats it as an opaque
/// label and never recomputes it from counts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum StatusTier {
    Good,
    Mid,
    Low,
}

impl StatusTier {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTier::Good => "good",
            StatusTier::Mid => "mid",
            StatusTier::Low => "low",
        }
    }
}

impl fmt::Display for StatusTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusTier {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "good" => Ok(StatusTier::Good),
            "mid" => Ok(StatusTier::Mid),
            "low" => Ok(StatusTier::Low),
            other => anyhow::bail!("invalid status tier: {other:?} (expected good, mid or low)"),
        }
    }
}

/// How an acceptance count maps to a rank axis value. Unknown mode strings
/// are rejected when the configuration is parsed, never silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RankMode {
    Position,
    Dense,
    Competition,
}

impl FromStr for RankMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "position" => Ok(RankMode::Position),
            "dense" => Ok(RankMode::Dense),
            "competition" => Ok(RankMode::Competition),
            other => anyhow::bail!(
                "invalid rank mode: {other:?} (expected position, dense or competition)"
            ),
        }
    }
}

/// Which population feeds the distribution binner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DistMode {
    Filtered,
    Total,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentLabel {
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    pub per_assignment: Vec<Acceptance>,
    pub per_assignment_raw: Vec<String>,
    pub accepted: usize,
    pub percent: f64,
    pub status: StatusTier,
    pub position_rank: u32,
}

/// One immutable version of the roster. Replaced wholesale on refresh; every
/// derived value is recomputed from scratch against the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub generated_at: DateTime<Utc>,
    pub assignment_labels: Vec<AssignmentLabel>,
    pub students: Vec<StudentRecord>,
    /// Acceptance count -> number of students with exactly that count, over
    /// the full roster. Levels with zero students may be absent.
    pub histogram: BTreeMap<usize, usize>,
}

impl RosterSnapshot {
    pub fn hw_count(&self) -> usize {
        self.assignment_labels.len()
    }

    /// Label range for headings, e.g. "HW01-HW07".
    pub fn hw_range(&self) -> String {
        match (self.assignment_labels.first(), self.assignment_labels.last()) {
            (Some(first), Some(last)) if self.assignment_labels.len() > 1 => {
                format!("{}-{}", first.label, last.label)
            }
            (Some(only), _) => only.label.clone(),
            _ => "HW".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CohortStats {
    pub n: usize,
    pub mean: f64,
    pub good_share: f64,
}

#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub active_statuses: BTreeSet<StatusTier>,
    pub min_accepted: usize,
    /// 0 means unlimited.
    pub top_n: u32,
    pub rank_mode: RankMode,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            active_statuses: BTreeSet::from([StatusTier::Good, StatusTier::Mid, StatusTier::Low]),
            min_accepted: 0,
            top_n: 0,
            rank_mode: RankMode::Position,
        }
    }
}
