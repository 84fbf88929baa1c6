//! Intervention decision engine.
//!
//! A pure function from situation signals plus the student's autonomy
//! preference to an intervention recommendation. Severity conflicts resolve
//! by rank (high > medium > hint > check_in > none), and every rule that
//! fires contributes its reasoning.

use serde::{Deserialize, Serialize};

/// Ordered by ascending severity so `Ord` gives the tie-break rank directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum InterventionLevel {
    #[default]
    None,
    CheckIn,
    Hint,
    Medium,
    High,
}

impl InterventionLevel {
    /// Recommended action wording for each level.
    pub fn action(self) -> &'static str {
        match self {
            Self::None => "No intervention - let student explore",
            Self::CheckIn => "Gentle check-in: 'How's it going? Need any help?'",
            Self::Hint => "Offer hints or resources, wait for request",
            Self::Medium => "Proactive help: provide guidance and step-by-step support",
            Self::High => "Immediate intervention: comprehensive help and explanation",
        }
    }
}

/// Ephemeral per-interaction signals; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterventionSignal {
    #[serde(default)]
    pub situation: String,
    #[serde(default)]
    pub time_stuck_minutes: Option<f64>,
    #[serde(default)]
    pub error_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRecommendation {
    pub should_intervene: bool,
    pub level: InterventionLevel,
    pub action: String,
    pub reasoning: String,
    pub autonomy_respected: bool,
}

/// Decision thresholds with the platform's defaults; tunable via settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Error count at or above which intervention is immediate.
    pub error_count_high: u32,
    /// Minutes stuck at or above which intervention is immediate.
    pub stuck_minutes_high: f64,
    /// Minutes stuck at which the autonomy preference starts to matter.
    pub stuck_minutes_medium: f64,
    /// Below this autonomy, a moderately stuck student gets proactive help.
    pub guidance_cutoff: f64,
    /// Below this autonomy, an idle student still gets a check-in.
    pub proactive_cutoff: f64,
    /// Above this autonomy, the student is explicitly left to explore.
    pub independent_cutoff: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            error_count_high: 3,
            stuck_minutes_high: 15.0,
            stuck_minutes_medium: 5.0,
            guidance_cutoff: 0.6,
            proactive_cutoff: 0.4,
            independent_cutoff: 0.7,
        }
    }
}

/// Autonomy assumed when no profile or stored preference exists.
pub const DEFAULT_AUTONOMY: f64 = 0.5;

/// Decide whether to intervene. Same inputs always produce the same output.
pub fn decide(
    autonomy_level: f64,
    signal: &InterventionSignal,
    config: &PolicyConfig,
) -> InterventionRecommendation {
    let mut should_intervene = false;
    let mut level = InterventionLevel::None;
    let mut reasoning: Vec<&str> = Vec::new();

    if signal.error_count.is_some_and(|n| n >= config.error_count_high) {
        should_intervene = true;
        level = level.max(InterventionLevel::High);
        reasoning.push("Multiple repeated errors detected");
    }

    match signal.time_stuck_minutes {
        Some(minutes) if minutes >= config.stuck_minutes_high => {
            should_intervene = true;
            level = level.max(InterventionLevel::High);
            reasoning.push("Student stuck for extended period");
        }
        Some(minutes) if minutes >= config.stuck_minutes_medium => {
            if autonomy_level < config.guidance_cutoff {
                should_intervene = true;
                level = level.max(InterventionLevel::Medium);
                reasoning.push("Student stuck and prefers guidance");
            } else {
                level = level.max(InterventionLevel::Hint);
                reasoning.push("Offer hints, respect autonomy preference");
            }
        }
        _ => {}
    }

    if !should_intervene && autonomy_level < config.proactive_cutoff {
        level = level.max(InterventionLevel::CheckIn);
        reasoning.push("Low autonomy preference, suggest check-in");
    }

    if !should_intervene && autonomy_level > config.independent_cutoff {
        // Severity rank keeps an already-earned hint in place.
        level = level.max(InterventionLevel::None);
        reasoning.push("High autonomy preference, let explore");
    }

    let reasoning = if reasoning.is_empty() {
        "No intervention needed".to_string()
    } else {
        reasoning.join(" | ")
    };

    InterventionRecommendation {
        should_intervene,
        level,
        action: level.action().to_string(),
        reasoning,
        autonomy_respected: !should_intervene && autonomy_level > 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PolicyConfig {
        PolicyConfig::default()
    }

    fn signal(stuck: Option<f64>, errors: Option<u32>) -> InterventionSignal {
        InterventionSignal {
            situation: "test".to_string(),
            time_stuck_minutes: stuck,
            error_count: errors,
        }
    }

    #[test]
    fn repeated_errors_force_high_intervention() {
        // No stored profile means the balanced default autonomy applies.
        let rec = decide(DEFAULT_AUTONOMY, &signal(None, Some(3)), &config());
        assert!(rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::High);
        assert!(rec.reasoning.contains("repeated errors"));
    }

    #[test]
    fn extended_stuck_time_forces_high_intervention() {
        let rec = decide(0.9, &signal(Some(20.0), None), &config());
        assert!(rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::High);
    }

    #[test]
    fn both_high_triggers_record_both_reasons() {
        let rec = decide(0.5, &signal(Some(16.0), Some(4)), &config());
        assert!(rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::High);
        assert!(rec.reasoning.contains("Multiple repeated errors detected"));
        assert!(rec.reasoning.contains("Student stuck for extended period"));
    }

    #[test]
    fn moderate_stuck_time_respects_autonomy() {
        let guided = decide(0.3, &signal(Some(7.0), None), &config());
        assert!(guided.should_intervene);
        assert_eq!(guided.level, InterventionLevel::Medium);

        let independent = decide(0.8, &signal(Some(7.0), None), &config());
        assert!(!independent.should_intervene);
        assert_eq!(independent.level, InterventionLevel::Hint);
    }

    #[test]
    fn low_autonomy_idle_student_gets_check_in() {
        let rec = decide(0.2, &signal(None, None), &config());
        assert!(!rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::CheckIn);
    }

    #[test]
    fn high_autonomy_exploring_student_is_left_alone() {
        let rec = decide(0.8, &signal(Some(2.0), None), &config());
        assert!(!rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::None);
        assert!(rec.reasoning.contains("let explore"));
        assert!(rec.autonomy_respected);
    }

    #[test]
    fn balanced_autonomy_with_no_signals_falls_through() {
        let rec = decide(DEFAULT_AUTONOMY, &signal(None, None), &config());
        assert!(!rec.should_intervene);
        assert_eq!(rec.level, InterventionLevel::None);
        assert_eq!(rec.reasoning, "No intervention needed");
    }

    #[test]
    fn severity_rank_orders_levels() {
        assert!(InterventionLevel::High > InterventionLevel::Medium);
        assert!(InterventionLevel::Medium > InterventionLevel::Hint);
        assert!(InterventionLevel::Hint > InterventionLevel::CheckIn);
        assert!(InterventionLevel::CheckIn > InterventionLevel::None);
    }

    #[test]
    fn decision_is_pure() {
        let sig = signal(Some(8.0), Some(2));
        let first = decide(0.45, &sig, &config());
        let second = decide(0.45, &sig, &config());
        assert_eq!(first.level, second.level);
        assert_eq!(first.should_intervene, second.should_intervene);
        assert_eq!(first.reasoning, second.reasoning);
    }
}
