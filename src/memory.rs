//! Per-user long-lived memory: preferences, interaction counters, notes,
//! assessment requests, and the capped learning-pattern history.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument};
use uuid::Uuid;

pub const DEFAULT_PATTERN_CAPACITY: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub topic: String,
    pub content: String,
    pub note_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub id: Uuid,
    pub topic: String,
    pub assessment_type: String,
    pub requested_at: DateTime<Utc>,
    pub status: String,
}

/// Weak-signal summary of one interaction; the per-user list is capped and
/// evicts oldest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPattern {
    pub timestamp: DateTime<Utc>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub preferences: HashMap<String, Value>,
    pub interaction_count: u64,
    pub notes: Vec<Note>,
    pub assessments: Vec<AssessmentRequest>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Default for MemoryRecord {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            preferences: HashMap::new(),
            interaction_count: 0,
            notes: Vec::new(),
            assessments: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }
}

/// Read-only view of everything remembered about a user. Unknown users get
/// empty-shaped defaults, never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub user_id: String,
    pub preferences: HashMap<String, Value>,
    pub interaction_count: u64,
    pub notes: Vec<Note>,
    pub assessments: Vec<AssessmentRequest>,
    pub patterns: Vec<LearningPattern>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Optional fields of a single memory update call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryUpdate {
    #[serde(default)]
    pub preferences: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub interaction_summary: Option<String>,
}

pub struct MemoryStore {
    records: DashMap<String, MemoryRecord>,
    patterns: DashMap<String, VecDeque<LearningPattern>>,
    pattern_capacity: usize,
}

impl MemoryStore {
    pub fn new(pattern_capacity: usize) -> Self {
        Self {
            records: DashMap::new(),
            patterns: DashMap::new(),
            pattern_capacity: pattern_capacity.max(1),
        }
    }

    /// Apply one interaction's worth of updates.
    ///
    /// Preference merges are last-write-wins per key. The interaction counter
    /// advances exactly once per call no matter which optional fields were
    /// supplied. Returns the new counter value.
    #[instrument(skip(self, update))]
    pub fn update(&self, user_id: &str, update: MemoryUpdate) -> Result<u64> {
        if user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }

        let count = {
            let mut record = self.records.entry(user_id.to_string()).or_default();

            if let Some(preferences) = update.preferences {
                for (key, value) in preferences {
                    record.preferences.insert(key, value);
                }
            }

            record.interaction_count += 1;
            record.last_updated = Utc::now();
            record.interaction_count
        };

        if let Some(summary) = update.interaction_summary {
            self.push_pattern(user_id, summary);
        }

        debug!(user_id, interaction_count = count, "Updated user memory");
        Ok(count)
    }

    fn push_pattern(&self, user_id: &str, summary: String) {
        let mut patterns = self.patterns.entry(user_id.to_string()).or_default();
        patterns.push_back(LearningPattern {
            timestamp: Utc::now(),
            summary,
        });
        while patterns.len() > self.pattern_capacity {
            patterns.pop_front();
        }
    }

    /// Append a note created during a learning session.
    #[instrument(skip(self, content))]
    pub fn add_note(
        &self,
        user_id: &str,
        topic: &str,
        content: &str,
        note_type: &str,
    ) -> Result<Note> {
        if user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }
        if topic.trim().is_empty() {
            return Err(anyhow!("topic must not be empty"));
        }

        let note = Note {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            content: content.to_string(),
            note_type: note_type.to_string(),
            created_at: Utc::now(),
        };

        let mut record = self.records.entry(user_id.to_string()).or_default();
        record.notes.push(note.clone());
        record.last_updated = Utc::now();
        Ok(note)
    }

    /// Record a pending assessment request for later coordination.
    #[instrument(skip(self))]
    pub fn record_assessment(
        &self,
        user_id: &str,
        topic: &str,
        assessment_type: &str,
    ) -> Result<AssessmentRequest> {
        if user_id.trim().is_empty() {
            return Err(anyhow!("user_id must not be empty"));
        }
        if topic.trim().is_empty() {
            return Err(anyhow!("topic must not be empty"));
        }

        let request = AssessmentRequest {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            assessment_type: assessment_type.to_string(),
            requested_at: Utc::now(),
            status: "pending".to_string(),
        };

        let mut record = self.records.entry(user_id.to_string()).or_default();
        record.assessments.push(request.clone());
        record.last_updated = Utc::now();
        Ok(request)
    }

    /// Pure read combining record and pattern history.
    pub fn snapshot(&self, user_id: &str) -> MemorySnapshot {
        let record = self.records.get(user_id).map(|entry| entry.value().clone());
        let patterns = self
            .patterns
            .get(user_id)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default();

        match record {
            Some(record) => MemorySnapshot {
                user_id: user_id.to_string(),
                preferences: record.preferences,
                interaction_count: record.interaction_count,
                notes: record.notes,
                assessments: record.assessments,
                patterns,
                last_updated: Some(record.last_updated),
            },
            None => MemorySnapshot {
                user_id: user_id.to_string(),
                preferences: HashMap::new(),
                interaction_count: 0,
                notes: Vec::new(),
                assessments: Vec::new(),
                patterns,
                last_updated: None,
            },
        }
    }

    pub fn pattern_count(&self, user_id: &str) -> usize {
        self.patterns
            .get(user_id)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Stored autonomy preference, if any interaction recorded one.
    pub fn autonomy_preference(&self, user_id: &str) -> Option<f64> {
        self.records
            .get(user_id)
            .and_then(|record| record.preferences.get("autonomy_level").cloned())
            .and_then(|value| value.as_f64())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_CAPACITY)
    }
}
