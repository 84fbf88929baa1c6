//! User profile data model and the keyed profile store.
//!
//! Profiles are produced once by the assessment flow and are read-mostly
//! afterwards; every later change goes through an explicit store call.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

const BREAKDOWN_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryStyle {
    Visual,
    HandsOn,
    Theoretical,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    Guided,
    SelfDirected,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointFrequency {
    #[serde(rename = "every_2_notebooks")]
    Every2Notebooks,
    #[serde(rename = "every_3_notebooks")]
    Every3Notebooks,
    #[serde(rename = "every_4_notebooks")]
    Every4Notebooks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceAssessment {
    pub level: ExperienceLevel,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_perception: Option<ExperienceLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years: Option<f64>,
}

/// Percentage split across content styles; components sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StyleBreakdown {
    pub visual: f64,
    pub hands_on: f64,
    pub theoretical: f64,
}

impl StyleBreakdown {
    pub fn balanced() -> Self {
        Self {
            visual: 0.33,
            hands_on: 0.34,
            theoretical: 0.33,
        }
    }

    pub fn sum(&self) -> f64 {
        self.visual + self.hands_on + self.theoretical
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningStyle {
    pub primary: PrimaryStyle,
    pub breakdown: StyleBreakdown,
    pub confidence: f64,
}

impl Default for LearningStyle {
    fn default() -> Self {
        Self {
            primary: PrimaryStyle::Mixed,
            breakdown: StyleBreakdown::balanced(),
            confidence: 0.5,
        }
    }
}

/// Guidance vs. autonomy preference. Both levels live in [0,1] but are
/// independent scores, not complements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPreferences {
    pub preference: ControlMode,
    pub guidance_level: f64,
    pub autonomy_level: f64,
}

impl Default for ControlPreferences {
    fn default() -> Self {
        Self {
            preference: ControlMode::Balanced,
            guidance_level: 0.5,
            autonomy_level: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGaps {
    pub capabilities: BTreeSet<String>,
    pub gaps: BTreeSet<String>,
    pub prerequisites: BTreeSet<String>,
    pub readiness_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pacing {
    pub hours_per_week: u32,
    pub notebooks_per_week: u32,
    pub checkpoint_frequency: CheckpointFrequency,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            hours_per_week: 5,
            notebooks_per_week: 2,
            checkpoint_frequency: CheckpointFrequency::Every3Notebooks,
        }
    }
}

/// Assessment-derived user profile, owned by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub experience: ExperienceAssessment,
    pub learning_style: LearningStyle,
    pub control_preferences: ControlPreferences,
    pub knowledge_gaps: KnowledgeGaps,
    pub pacing: Pacing,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl UserProfile {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(anyhow!("Profile is missing a user_id"));
        }

        let unit_fields = [
            ("experience.confidence", self.experience.confidence),
            ("learning_style.confidence", self.learning_style.confidence),
            (
                "control_preferences.guidance_level",
                self.control_preferences.guidance_level,
            ),
            (
                "control_preferences.autonomy_level",
                self.control_preferences.autonomy_level,
            ),
            (
                "knowledge_gaps.readiness_score",
                self.knowledge_gaps.readiness_score,
            ),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(anyhow!("{} must be within [0, 1], got {}", name, value));
            }
        }

        if (self.learning_style.breakdown.sum() - 1.0).abs() > BREAKDOWN_EPSILON {
            return Err(anyhow!(
                "Learning style breakdown must sum to 1.0, got {}",
                self.learning_style.breakdown.sum()
            ));
        }

        if self.pacing.notebooks_per_week == 0 {
            return Err(anyhow!("Pacing requires at least one notebook per week"));
        }

        Ok(())
    }
}

/// Keyed mapping of assessment-derived profiles.
///
/// Unknown users are never an error on the read path; callers fall back to
/// balanced/intermediate defaults.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a validated profile, replacing any previous one for the user.
    pub fn store(&self, profile: UserProfile) -> Result<()> {
        profile.validate()?;
        debug!(user_id = %profile.user_id, "Storing user profile");
        self.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<UserProfile> {
        self.profiles.get(user_id).map(|entry| entry.value().clone())
    }

    /// Explicit profile-update call; the only mutation path besides `store`.
    pub fn update<F>(&self, user_id: &str, apply: F) -> Result<UserProfile>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut entry = self
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| anyhow!("No profile stored for user '{}'", user_id))?;
        let mut candidate = entry.value().clone();
        apply(&mut candidate);
        candidate.last_updated = Utc::now();
        candidate.validate()?;
        *entry.value_mut() = candidate.clone();
        Ok(candidate)
    }

    pub fn autonomy_level(&self, user_id: &str) -> Option<f64> {
        self.profiles
            .get(user_id)
            .map(|p| p.control_preferences.autonomy_level)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
