//! Teaching strategy adaptation.
//!
//! Stateless mapping from performance metrics, learning style, and pattern
//! history to concrete strategy adjustments.

use crate::profile::PrimaryStyle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyAdjustment {
    Decrease,
    Maintain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceAdjustment {
    Increase,
    Maintain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingAdjustment {
    SlowDown,
    Maintain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceData {
    #[serde(default)]
    pub errors: u32,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default)]
    pub completion_time_minutes: f64,
}

fn default_attempts() -> u32 {
    1
}

impl Default for PerformanceData {
    fn default() -> Self {
        Self {
            errors: 0,
            attempts: 1,
            completion_time_minutes: 0.0,
        }
    }
}

impl PerformanceData {
    /// A student is struggling on more than 3 errors, more than 5 attempts,
    /// or a long completion time combined with repeated errors.
    pub fn is_struggling(&self) -> bool {
        self.errors > 3
            || self.attempts > 5
            || (self.completion_time_minutes > 30.0 && self.errors > 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAdjustment {
    pub difficulty_adjustment: DifficultyAdjustment,
    pub guidance_level: GuidanceAdjustment,
    pub pacing: PacingAdjustment,
    pub recommendations: Vec<String>,
    pub learning_style_adaptation: PrimaryStyle,
    pub is_struggling: bool,
}

/// Number of recorded learning patterns beyond which recent history is
/// considered a usable signal.
const PATTERN_SIGNAL_THRESHOLD: usize = 5;

pub fn adapt(
    learning_style: PrimaryStyle,
    pattern_count: usize,
    performance: &PerformanceData,
) -> StrategyAdjustment {
    let is_struggling = performance.is_struggling();
    let mut recommendations = Vec::new();

    if is_struggling {
        recommendations.push("Break down into smaller steps".to_string());
        recommendations.push("Provide more examples".to_string());
        recommendations.push("Increase guidance level".to_string());

        match learning_style {
            PrimaryStyle::Visual => {
                recommendations.push("Add visual aids and diagrams".to_string());
            }
            PrimaryStyle::HandsOn => {
                recommendations.push("Add more practice exercises".to_string());
            }
            PrimaryStyle::Theoretical => {
                recommendations.push("Provide deeper conceptual explanations".to_string());
            }
            PrimaryStyle::Mixed => {}
        }
    } else {
        recommendations.push("Maintain current pace".to_string());
        recommendations.push("Consider increasing difficulty".to_string());
        recommendations.push("Offer optional advanced content".to_string());
    }

    if pattern_count > PATTERN_SIGNAL_THRESHOLD {
        recommendations.push("Leverage successful patterns from recent sessions".to_string());
    }

    StrategyAdjustment {
        difficulty_adjustment: if is_struggling {
            DifficultyAdjustment::Decrease
        } else {
            DifficultyAdjustment::Maintain
        },
        guidance_level: if is_struggling {
            GuidanceAdjustment::Increase
        } else {
            GuidanceAdjustment::Maintain
        },
        pacing: if is_struggling {
            PacingAdjustment::SlowDown
        } else {
            PacingAdjustment::Maintain
        },
        recommendations,
        learning_style_adaptation: learning_style,
        is_struggling,
    }
}
