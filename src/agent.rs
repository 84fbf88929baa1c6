//! Specialist agent collaborators.
//!
//! Every specialist (concept explainer, code reviewer, assessment checker,
//! content generator, curriculum planner, user assessment) is a black box
//! behind the [`Specialist`] trait. Real deployments back these with LLM
//! calls; the built-ins here are deterministic stand-ins for development,
//! batch runs, and tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Names of the specialists the orchestrator routes to.
pub const SPECIALIST_NAMES: [&str; 6] = [
    "concept_explainer",
    "code_reviewer",
    "assessment_checker",
    "content_generator",
    "curriculum_planner",
    "user_assessment",
];

/// Single collaborator contract: a prompt plus structured context in, text out.
#[async_trait]
pub trait Specialist: Send + Sync {
    fn name(&self) -> &str;
    fn specialty(&self) -> &str;
    async fn invoke(&self, prompt: &str, context: &Value) -> Result<String>;
}

/// Echoes its input; useful for wiring tests.
pub struct EchoSpecialist {
    request_count: AtomicU64,
}

impl EchoSpecialist {
    pub fn new() -> Self {
        Self {
            request_count: AtomicU64::new(0),
        }
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

impl Default for EchoSpecialist {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Specialist for EchoSpecialist {
    fn name(&self) -> &str {
        "echo"
    }

    fn specialty(&self) -> &str {
        "diagnostics"
    }

    async fn invoke(&self, prompt: &str, _context: &Value) -> Result<String> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        Ok(format!("Echo: {prompt}"))
    }
}

/// Deterministic specialist that serves queued replies, then falls back to a
/// templated response. Stands in for an LLM-backed specialist.
pub struct ScriptedSpecialist {
    name: String,
    specialty: String,
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedSpecialist {
    pub fn new(name: &str, specialty: &str) -> Self {
        Self {
            name: name.to_string(),
            specialty: specialty.to_string(),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_replies(name: &str, specialty: &str, replies: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            specialty: specialty.to_string(),
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn queue_reply(&self, reply: String) {
        self.replies.lock().push_back(reply);
    }
}

#[async_trait]
impl Specialist for ScriptedSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    fn specialty(&self) -> &str {
        &self.specialty
    }

    async fn invoke(&self, prompt: &str, _context: &Value) -> Result<String> {
        if let Some(reply) = self.replies.lock().pop_front() {
            return Ok(reply);
        }
        info!(specialist = %self.name, "Serving templated specialist reply");
        Ok(format!("[{}] {}", self.specialty, prompt))
    }
}

/// Build a specialist stand-in by its registry name.
pub struct SpecialistFactory;

impl SpecialistFactory {
    fn specialty_for(name: &str) -> Option<&'static str> {
        match name {
            "concept_explainer" => Some("concept explanation"),
            "code_reviewer" => Some("code review"),
            "assessment_checker" => Some("assessment checking"),
            "content_generator" => Some("content generation"),
            "curriculum_planner" => Some("curriculum planning"),
            "user_assessment" => Some("user assessment"),
            _ => None,
        }
    }

    pub fn create(name: &str) -> Result<ScriptedSpecialist> {
        let specialty =
            Self::specialty_for(name).ok_or_else(|| anyhow!("Unknown specialist '{}'", name))?;
        Ok(ScriptedSpecialist::new(name, specialty))
    }

    /// The full default roster.
    pub fn default_roster() -> Vec<ScriptedSpecialist> {
        SPECIALIST_NAMES
            .iter()
            .filter_map(|name| {
                Self::specialty_for(name).map(|specialty| ScriptedSpecialist::new(name, specialty))
            })
            .collect()
    }
}
