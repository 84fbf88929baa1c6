//! Per-user topic-mastery tracking.
//!
//! A topic lives in at most one of the three mastery sets at any time; every
//! transition removes it from all sets before inserting into the target, so
//! the invariant holds even across repeated identical calls.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Mastered,
    InProgress,
    Struggling,
    NotStarted,
}

impl FromStr for MasteryLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mastered" => Ok(Self::Mastered),
            "in_progress" => Ok(Self::InProgress),
            "struggling" => Ok(Self::Struggling),
            "not_started" => Ok(Self::NotStarted),
            other => Err(anyhow!(
                "Invalid mastery_level '{}'; expected one of mastered, in_progress, struggling, not_started",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub mastered: BTreeSet<String>,
    pub in_progress: BTreeSet<String>,
    pub struggling: BTreeSet<String>,
    pub completion_rate: f64,
    pub last_activity: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Move `topic` to the set named by `level` (or out of all sets for
    /// `NotStarted`) and recompute the completion rate.
    fn apply(&mut self, topic: &str, level: MasteryLevel) {
        self.mastered.remove(topic);
        self.in_progress.remove(topic);
        self.struggling.remove(topic);

        match level {
            MasteryLevel::Mastered => {
                self.mastered.insert(topic.to_string());
            }
            MasteryLevel::InProgress => {
                self.in_progress.insert(topic.to_string());
            }
            MasteryLevel::Struggling => {
                self.struggling.insert(topic.to_string());
            }
            MasteryLevel::NotStarted => {}
        }

        self.completion_rate = self.compute_completion_rate();
        self.last_activity = Some(Utc::now());
    }

    fn compute_completion_rate(&self) -> f64 {
        let total = self.mastered.len() + self.in_progress.len() + self.struggling.len();
        if total == 0 {
            0.0
        } else {
            self.mastered.len() as f64 / total as f64
        }
    }

    pub fn tracked_topics(&self) -> usize {
        self.mastered.len() + self.in_progress.len() + self.struggling.len()
    }
}

/// Read-only view returned to callers; building it never mutates state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub user_id: String,
    pub mastered: Vec<String>,
    pub in_progress: Vec<String>,
    pub struggling: Vec<String>,
    pub completion_rate: f64,
    pub last_activity: Option<DateTime<Utc>>,
    pub summary: String,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    records: DashMap<String, ProgressRecord>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a mastery transition and return the resulting completion rate.
    ///
    /// The entry guard holds the per-key lock for the whole read-modify-write,
    /// so concurrent calls for the same user serialize here.
    #[instrument(skip(self))]
    pub fn track(&self, user_id: &str, topic: &str, level: MasteryLevel) -> Result<f64> {
        if user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }
        if topic.trim().is_empty() {
            return Err(anyhow!("topic must not be empty"));
        }

        let mut record = self.records.entry(user_id.to_string()).or_default();
        record.apply(topic, level);
        debug!(
            user_id,
            topic,
            ?level,
            completion_rate = record.completion_rate,
            "Tracked progress"
        );
        Ok(record.completion_rate)
    }

    /// Pure read; unknown users get an empty record, never an error.
    pub fn snapshot(&self, user_id: &str) -> ProgressSnapshot {
        let record = self
            .records
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let summary = format!(
            "Student {} has mastered {} topics, working on {} topics, and struggling with {} topics. Completion rate: {:.1}%",
            user_id,
            record.mastered.len(),
            record.in_progress.len(),
            record.struggling.len(),
            record.completion_rate * 100.0
        );

        ProgressSnapshot {
            user_id: user_id.to_string(),
            mastered: record.mastered.iter().cloned().collect(),
            in_progress: record.in_progress.iter().cloned().collect(),
            struggling: record.struggling.iter().cloned().collect(),
            completion_rate: record.completion_rate,
            last_activity: record.last_activity,
            summary,
        }
    }

    pub fn record(&self, user_id: &str) -> ProgressRecord {
        self.records
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}
