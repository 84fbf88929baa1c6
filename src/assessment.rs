//! User assessment: turns free-text analysis of a learner into a structured
//! profile.
//!
//! The keyword heuristics here are a reference baseline standing in for a
//! real classifier. They sit behind the [`Classifier`] trait so a model-backed
//! implementation can replace them without touching policy or orchestrator
//! code.

use crate::profile::{
    CheckpointFrequency, ControlMode, ControlPreferences, ExperienceAssessment, ExperienceLevel,
    KnowledgeGaps, LearningStyle, Pacing, PrimaryStyle, StyleBreakdown, UserProfile,
};
use anyhow::Result;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

static YEARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:year|yr)").expect("valid years regex"));
static HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(?:hour|hr|h)s?\s*(?:per|/)\s*(?:week|wk)").expect("valid hours regex")
});

/// Narrow classification seam (structured result from free text).
pub trait Classifier: Send + Sync {
    fn classify(&self, topic: &str, text: &str) -> AssessmentAnalysis;
}

#[derive(Debug, Clone)]
pub struct AssessmentAnalysis {
    pub experience: ExperienceAssessment,
    pub learning_style: LearningStyle,
    pub control_preferences: ControlPreferences,
    pub knowledge_gaps: KnowledgeGaps,
    pub pacing: Pacing,
}

/// Keyword-counting baseline classifier.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    fn experience(&self, text: &str) -> ExperienceAssessment {
        let lower = text.to_lowercase();

        let beginner_markers = [
            "absolute beginner",
            "complete beginner",
            "no experience",
            "never",
            "zero knowledge",
            "starting from scratch",
        ];
        let intermediate_markers = ["intermediate", "some experience", "familiar", "know basics"];
        let advanced_markers = ["advanced", "expert", "proficient", "experienced", "mastery"];

        let (level, confidence) = if beginner_markers.iter().any(|m| lower.contains(m)) {
            (ExperienceLevel::Beginner, 0.9)
        } else if intermediate_markers.iter().any(|m| lower.contains(m)) {
            (ExperienceLevel::Intermediate, 0.85)
        } else if advanced_markers.iter().any(|m| lower.contains(m)) {
            (ExperienceLevel::Advanced, 0.85)
        } else {
            (ExperienceLevel::Beginner, 0.6)
        };

        let self_perception = if ["thinks", "perceives", "believes"]
            .iter()
            .any(|m| lower.contains(m))
        {
            if lower.contains("beginner") {
                Some(ExperienceLevel::Beginner)
            } else if lower.contains("intermediate") {
                Some(ExperienceLevel::Intermediate)
            } else if lower.contains("advanced") {
                Some(ExperienceLevel::Advanced)
            } else {
                None
            }
        } else {
            None
        };

        let years = YEARS_RE
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok());

        ExperienceAssessment {
            level,
            confidence,
            self_perception,
            years,
        }
    }

    fn learning_style(&self, text: &str) -> LearningStyle {
        let lower = text.to_lowercase();

        let count = |words: &[&str]| -> usize {
            words.iter().filter(|w| lower.contains(*w)).count()
        };

        let visual = count(&["visual", "diagram", "chart", "see", "watch", "image", "picture"]);
        let hands_on = count(&[
            "hands-on", "practice", "coding", "exercise", "project", "doing", "practical",
        ]);
        let theory = count(&["theory", "concept", "explain", "read", "understand", "learn about"]);

        let total = visual + hands_on + theory;
        let breakdown = if total == 0 {
            StyleBreakdown::balanced()
        } else {
            StyleBreakdown {
                visual: visual as f64 / total as f64,
                hands_on: hands_on as f64 / total as f64,
                theoretical: theory as f64 / total as f64,
            }
        };

        let primary = if breakdown.hands_on >= 0.5 {
            PrimaryStyle::HandsOn
        } else if breakdown.visual >= 0.4 {
            PrimaryStyle::Visual
        } else if breakdown.theoretical >= 0.4 {
            PrimaryStyle::Theoretical
        } else {
            PrimaryStyle::Mixed
        };

        LearningStyle {
            primary,
            breakdown,
            confidence: if total > 0 { 0.7 } else { 0.5 },
        }
    }

    fn control_preferences(&self, text: &str) -> ControlPreferences {
        let lower = text.to_lowercase();

        let count = |words: &[&str]| -> usize {
            words.iter().filter(|w| lower.contains(*w)).count()
        };

        let guided = count(&[
            "guided", "step-by-step", "structured", "instructions", "help", "direction",
        ]);
        let self_directed = count(&[
            "self-directed", "explore", "autonomous", "independent", "on my own", "freedom",
        ]);
        let balanced = count(&["balanced", "some guidance", "flexibility", "both"]);

        let (preference, guidance_level, autonomy_level) =
            if balanced > 0 || (guided > 0 && self_directed > 0) {
                (ControlMode::Balanced, 0.6, 0.4)
            } else if self_directed > guided {
                (ControlMode::SelfDirected, 0.3, 0.7)
            } else if guided > 0 {
                (ControlMode::Guided, 0.8, 0.2)
            } else {
                (ControlMode::Balanced, 0.5, 0.5)
            };

        ControlPreferences {
            preference,
            guidance_level,
            autonomy_level,
        }
    }

    fn knowledge_gaps(&self, topic: &str, text: &str) -> KnowledgeGaps {
        let lower = text.to_lowercase();
        let is_beginner = [
            "absolute beginner",
            "complete beginner",
            "no knowledge",
            "zero",
            "nothing",
            "starting from scratch",
        ]
        .iter()
        .any(|m| lower.contains(m));

        if is_beginner {
            return KnowledgeGaps {
                capabilities: BTreeSet::new(),
                gaps: BTreeSet::from([
                    format!("All {topic} fundamentals"),
                    "Basic concepts and terminology".to_string(),
                    "Core principles and foundations".to_string(),
                ]),
                prerequisites: BTreeSet::from([
                    "Introduction to basic concepts".to_string(),
                    "Fundamental terminology".to_string(),
                    "Getting started guide".to_string(),
                ]),
                readiness_score: 0.1,
            };
        }

        let mut capabilities = BTreeSet::new();
        if lower.contains("basic") || lower.contains("fundamental") {
            capabilities.insert("Basic understanding of core concepts".to_string());
        }
        if lower.contains("familiar") || lower.contains("know") {
            capabilities.insert("Familiarity with fundamental terminology".to_string());
        }

        let mut gaps = BTreeSet::new();
        if lower.contains("advanced") {
            gaps.insert("Advanced implementation patterns".to_string());
        }
        if lower.contains("best practices") || lower.contains("optimization") {
            gaps.insert("Best practices and optimization techniques".to_string());
        }
        if gaps.is_empty() {
            gaps.insert("Advanced topics and techniques".to_string());
        }

        let mut prerequisites = BTreeSet::new();
        if lower.contains("intermediate") {
            prerequisites.insert("Intermediate-level understanding of basics".to_string());
        }
        if lower.contains("practical") || lower.contains("experience") {
            prerequisites.insert("Practical experience with simple examples".to_string());
        }

        let readiness_score = if lower.contains("intermediate") {
            0.65
        } else if lower.contains("beginner") {
            0.3
        } else {
            0.5
        };

        KnowledgeGaps {
            capabilities,
            gaps,
            prerequisites,
            readiness_score,
        }
    }

    fn pacing(&self, text: &str) -> Pacing {
        let lower = text.to_lowercase();
        let hours_per_week = HOURS_RE
            .captures(&lower)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(5);

        let notebooks_per_week = if hours_per_week >= 10 {
            3
        } else if hours_per_week >= 5 {
            2
        } else {
            1
        };

        let checkpoint_frequency = match notebooks_per_week {
            n if n >= 3 => CheckpointFrequency::Every2Notebooks,
            2 => CheckpointFrequency::Every3Notebooks,
            _ => CheckpointFrequency::Every4Notebooks,
        };

        Pacing {
            hours_per_week,
            notebooks_per_week,
            checkpoint_frequency,
        }
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, topic: &str, text: &str) -> AssessmentAnalysis {
        debug!(topic, chars = text.len(), "Classifying assessment narrative");
        AssessmentAnalysis {
            experience: self.experience(text),
            learning_style: self.learning_style(text),
            control_preferences: self.control_preferences(text),
            knowledge_gaps: self.knowledge_gaps(topic, text),
            pacing: self.pacing(text),
        }
    }
}

/// Assemble and validate a complete profile from an assessment narrative.
pub fn build_profile(
    classifier: &dyn Classifier,
    user_id: &str,
    topic: &str,
    narrative: &str,
) -> Result<UserProfile> {
    let analysis = classifier.classify(topic, narrative);
    let now = Utc::now();
    let profile = UserProfile {
        user_id: user_id.to_string(),
        experience: analysis.experience,
        learning_style: analysis.learning_style,
        control_preferences: analysis.control_preferences,
        knowledge_gaps: analysis.knowledge_gaps,
        pacing: analysis.pacing,
        created_at: now,
        last_updated: now,
    };
    profile.validate()?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beginner_narrative_classifies_as_beginner() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify(
            "rust",
            "I'm a complete beginner, starting from scratch with no experience.",
        );
        assert_eq!(analysis.experience.level, ExperienceLevel::Beginner);
        assert!(analysis.experience.confidence >= 0.9);
        assert!((analysis.knowledge_gaps.readiness_score - 0.1).abs() < 1e-9);
        assert!(analysis
            .knowledge_gaps
            .gaps
            .contains("All rust fundamentals"));
    }

    #[test]
    fn hands_on_narrative_dominates_style() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify(
            "python",
            "I learn by doing: practice, coding exercises, and a real project.",
        );
        assert_eq!(analysis.learning_style.primary, PrimaryStyle::HandsOn);
        assert!((analysis.learning_style.breakdown.sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn self_directed_preference_raises_autonomy() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify(
            "go",
            "I want to explore on my own and stay independent while learning.",
        );
        assert_eq!(
            analysis.control_preferences.preference,
            ControlMode::SelfDirected
        );
        assert!((analysis.control_preferences.autonomy_level - 0.7).abs() < 1e-9);
    }

    #[test]
    fn mixed_guidance_signals_resolve_to_balanced() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify(
            "sql",
            "I like step-by-step instructions but also want freedom to explore.",
        );
        assert_eq!(analysis.control_preferences.preference, ControlMode::Balanced);
    }

    #[test]
    fn pacing_parses_hours_and_derives_tiers() {
        let classifier = KeywordClassifier::new();

        let busy = classifier.classify("rust", "I can spend 12 hours per week on this.");
        assert_eq!(busy.pacing.hours_per_week, 12);
        assert_eq!(busy.pacing.notebooks_per_week, 3);
        assert_eq!(
            busy.pacing.checkpoint_frequency,
            CheckpointFrequency::Every2Notebooks
        );

        let light = classifier.classify("rust", "Maybe 3 hours/week.");
        assert_eq!(light.pacing.hours_per_week, 3);
        assert_eq!(light.pacing.notebooks_per_week, 1);
        assert_eq!(
            light.pacing.checkpoint_frequency,
            CheckpointFrequency::Every4Notebooks
        );
    }

    #[test]
    fn years_of_experience_are_extracted() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify("rust", "I have 4 years of experience, intermediate.");
        assert_eq!(analysis.experience.years, Some(4.0));
        assert_eq!(analysis.experience.level, ExperienceLevel::Intermediate);
    }

    #[test]
    fn built_profile_passes_validation() {
        let classifier = KeywordClassifier::new();
        let profile = build_profile(
            &classifier,
            "u1",
            "rust",
            "Intermediate, hands-on, around 6 hours per week, some guidance please.",
        )
        .unwrap();
        assert_eq!(profile.user_id, "u1");
        assert!(profile.validate().is_ok());
        assert_eq!(profile.pacing.notebooks_per_week, 2);
    }

    #[test]
    fn empty_narrative_yields_balanced_defaults() {
        let classifier = KeywordClassifier::new();
        let analysis = classifier.classify("rust", "");
        assert_eq!(analysis.learning_style.primary, PrimaryStyle::Mixed);
        assert!((analysis.control_preferences.autonomy_level - 0.5).abs() < 1e-9);
        assert_eq!(analysis.pacing.hours_per_week, 5);
    }
}
