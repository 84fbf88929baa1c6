//! Core coordinator: routes user messages to specialist collaborators and
//! exposes the typed tool surface over the per-user stores.
//!
//! Intent routing is a soft dispatch behind [`IntentRouter`]; the hard
//! contract of this module is [`ToolRequest`] / [`ToolOutcome`] plus the
//! commit-after-success rule: an interaction is recorded in memory only once
//! the specialist round trip has succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::{
    agent::{Specialist, SpecialistFactory},
    assessment::{build_profile, Classifier, KeywordClassifier},
    memory::{MemoryStore, MemoryUpdate},
    policy::{self, InterventionSignal, PolicyConfig, DEFAULT_AUTONOMY},
    profile::{PrimaryStyle, ProfileStore},
    progress::{MasteryLevel, ProgressTracker},
    strategy::{self, PerformanceData},
};

/// What the student is asking for, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ExplainConcept,
    ReviewCode,
    CheckAssessment,
    GenerateContent,
    PlanCurriculum,
    AssessUser,
}

impl Intent {
    pub fn specialist_name(self) -> &'static str {
        match self {
            Self::ExplainConcept => "concept_explainer",
            Self::ReviewCode => "code_reviewer",
            Self::CheckAssessment => "assessment_checker",
            Self::GenerateContent => "content_generator",
            Self::PlanCurriculum => "curriculum_planner",
            Self::AssessUser => "user_assessment",
        }
    }
}

/// Soft dispatch seam. In production this is the language model's own intent
/// classification; the default keyword baseline keeps the core testable.
pub trait IntentRouter: Send + Sync {
    fn route(&self, message: &str) -> Intent;
}

#[derive(Debug, Default, Clone)]
pub struct KeywordRouter;

impl IntentRouter for KeywordRouter {
    fn route(&self, message: &str) -> Intent {
        let lower = message.to_lowercase();
        let any = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if any(&["review", "debug", "my code", "refactor"]) {
            Intent::ReviewCode
        } else if any(&["quiz", "test me", "assessment", "check my understanding"]) {
            Intent::CheckAssessment
        } else if any(&["curriculum", "learning path", "roadmap", "syllabus", "plan my"]) {
            Intent::PlanCurriculum
        } else if any(&["generate", "create notes", "more examples", "notebook"]) {
            Intent::GenerateContent
        } else if any(&["assess me", "my level", "just starting", "new here"]) {
            Intent::AssessUser
        } else {
            Intent::ExplainConcept
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopicUpdate {
    pub topic: String,
    pub mastery_level: String,
}

/// The typed capability surface: every operation the agent framework may
/// call, with a fixed input schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ToolRequest {
    GetUserMemory {
        user_id: String,
    },
    UpdateUserMemory {
        user_id: String,
        #[serde(default)]
        preferences: Option<HashMap<String, Value>>,
        #[serde(default)]
        progress_update: Option<Vec<TopicUpdate>>,
        #[serde(default)]
        interaction_summary: Option<String>,
    },
    TrackProgress {
        user_id: String,
        topic: String,
        mastery_level: String,
        #[serde(default)]
        notes: Option<String>,
    },
    GetStudentProgress {
        user_id: String,
    },
    CreateNote {
        user_id: String,
        topic: String,
        content: String,
        #[serde(default = "default_note_type")]
        note_type: String,
    },
    ShouldIntervene {
        user_id: String,
        situation: String,
        #[serde(default)]
        time_stuck_minutes: Option<f64>,
        #[serde(default)]
        error_count: Option<u32>,
    },
    AdaptStrategy {
        user_id: String,
        topic: String,
        #[serde(default)]
        performance: PerformanceData,
    },
    ConductAssessment {
        user_id: String,
        topic: String,
        #[serde(default = "default_assessment_type")]
        assessment_type: String,
    },
    CreateUserProfile {
        user_id: String,
        topic: String,
        narrative: String,
    },
    GetUserProfile {
        user_id: String,
    },
}

fn default_note_type() -> String {
    "supplementary".to_string()
}

fn default_assessment_type() -> String {
    "checkpoint".to_string()
}

/// Uniform tool result: failures surface as `success=false` with a message
/// so the caller can always keep the conversation going.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Value,
}

impl ToolOutcome {
    fn ok(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    fn ok_with_message(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Value::Null,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    #[serde(default)]
    pub signal: Option<InterventionSignal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TutorReply {
    pub success: bool,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialist: Option<String>,
    pub intent: Intent,
    pub intervention: crate::policy::InterventionRecommendation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_count: Option<u64>,
}

/// The tutoring orchestrator.
pub struct Tutor {
    specialists: RwLock<HashMap<String, Arc<dyn Specialist>>>,
    profiles: Arc<ProfileStore>,
    memory: Arc<MemoryStore>,
    progress: Arc<ProgressTracker>,
    policy: PolicyConfig,
    classifier: Arc<dyn Classifier>,
    router: Arc<dyn IntentRouter>,
    specialist_timeout: Duration,
}

impl Tutor {
    pub fn new(policy: PolicyConfig, pattern_capacity: usize, specialist_timeout: Duration) -> Self {
        Self {
            specialists: RwLock::new(HashMap::new()),
            profiles: Arc::new(ProfileStore::new()),
            memory: Arc::new(MemoryStore::new(pattern_capacity)),
            progress: Arc::new(ProgressTracker::new()),
            policy,
            classifier: Arc::new(KeywordClassifier::new()),
            router: Arc::new(KeywordRouter),
            specialist_timeout,
        }
    }

    pub fn with_router(mut self, router: Arc<dyn IntentRouter>) -> Self {
        self.router = router;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Register the scripted stand-in roster for every known specialist.
    pub async fn register_default_roster(&self) {
        for specialist in SpecialistFactory::default_roster() {
            self.register_specialist(Arc::new(specialist)).await;
        }
    }

    #[instrument(skip(self, specialist), fields(name = specialist.name()))]
    pub async fn register_specialist(&self, specialist: Arc<dyn Specialist>) {
        info!("Registering specialist: {}", specialist.name());
        self.specialists
            .write()
            .await
            .insert(specialist.name().to_string(), specialist);
    }

    pub async fn list_specialists(&self) -> Vec<String> {
        let mut names: Vec<String> = self.specialists.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn profiles(&self) -> &Arc<ProfileStore> {
        &self.profiles
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub fn progress(&self) -> &Arc<ProgressTracker> {
        &self.progress
    }

    /// Stored autonomy preference with the balanced default for unknown
    /// users. A preference recorded during interactions wins over the
    /// assessment-time profile value.
    fn resolve_autonomy(&self, user_id: &str) -> f64 {
        self.memory
            .autonomy_preference(user_id)
            .or_else(|| self.profiles.autonomy_level(user_id))
            .unwrap_or(DEFAULT_AUTONOMY)
    }

    fn learning_style(&self, user_id: &str) -> PrimaryStyle {
        self.profiles
            .get(user_id)
            .map(|p| p.learning_style.primary)
            .unwrap_or(PrimaryStyle::Mixed)
    }

    /// Execute one typed tool operation. All state is in-memory, so this
    /// never suspends.
    #[instrument(skip(self, request))]
    pub fn execute_tool(&self, request: ToolRequest) -> ToolOutcome {
        match request {
            ToolRequest::GetUserMemory { user_id } => {
                if user_id.trim().is_empty() {
                    return ToolOutcome::fail("user_id is required");
                }
                // Full recall: memory, pattern history, and progress together.
                let memory = self.memory.snapshot(&user_id);
                let progress = self.progress.snapshot(&user_id);
                ToolOutcome::ok(json!({
                    "memory": memory,
                    "progress": progress,
                }))
            }

            ToolRequest::UpdateUserMemory {
                user_id,
                preferences,
                progress_update,
                interaction_summary,
            } => {
                // Progress piggybacked on a memory update goes through the
                // tracker's invariant-preserving mutator, never a raw merge.
                if let Some(updates) = progress_update {
                    for update in updates {
                        let level: MasteryLevel = match update.mastery_level.parse() {
                            Ok(level) => level,
                            Err(e) => return ToolOutcome::fail(e.to_string()),
                        };
                        if let Err(e) = self.progress.track(&user_id, &update.topic, level) {
                            return ToolOutcome::fail(e.to_string());
                        }
                    }
                }

                match self.memory.update(
                    &user_id,
                    MemoryUpdate {
                        preferences,
                        interaction_summary,
                    },
                ) {
                    Ok(count) => ToolOutcome::ok_with_message(
                        "Memory updated successfully",
                        json!({ "user_id": user_id, "interaction_count": count }),
                    ),
                    Err(e) => ToolOutcome::fail(e.to_string()),
                }
            }

            ToolRequest::TrackProgress {
                user_id,
                topic,
                mastery_level,
                notes,
            } => {
                let level: MasteryLevel = match mastery_level.parse() {
                    Ok(level) => level,
                    Err(e) => return ToolOutcome::fail(e.to_string()),
                };
                match self.progress.track(&user_id, &topic, level) {
                    Ok(completion_rate) => ToolOutcome::ok(json!({
                        "user_id": user_id,
                        "topic": topic,
                        "mastery_level": level,
                        "notes": notes,
                        "completion_rate": completion_rate,
                    })),
                    Err(e) => ToolOutcome::fail(e.to_string()),
                }
            }

            ToolRequest::GetStudentProgress { user_id } => {
                if user_id.trim().is_empty() {
                    return ToolOutcome::fail("user_id is required");
                }
                let snapshot = self.progress.snapshot(&user_id);
                let memory = self.memory.snapshot(&user_id);
                ToolOutcome::ok(json!({
                    "progress": snapshot,
                    "preferences": memory.preferences,
                    "interaction_count": memory.interaction_count,
                }))
            }

            ToolRequest::CreateNote {
                user_id,
                topic,
                content,
                note_type,
            } => match self.memory.add_note(&user_id, &topic, &content, &note_type) {
                Ok(note) => ToolOutcome::ok_with_message(
                    format!("Note created successfully for topic: {topic}"),
                    json!(note),
                ),
                Err(e) => ToolOutcome::fail(e.to_string()),
            },

            ToolRequest::ShouldIntervene {
                user_id,
                situation,
                time_stuck_minutes,
                error_count,
            } => {
                if user_id.trim().is_empty() {
                    return ToolOutcome::fail("user_id is required");
                }
                let autonomy = self.resolve_autonomy(&user_id);
                let signal = InterventionSignal {
                    situation,
                    time_stuck_minutes,
                    error_count,
                };
                let recommendation = policy::decide(autonomy, &signal, &self.policy);
                ToolOutcome::ok(json!({
                    "user_id": user_id,
                    "recommendation": recommendation,
                }))
            }

            ToolRequest::AdaptStrategy {
                user_id,
                topic,
                performance,
            } => {
                if user_id.trim().is_empty() {
                    return ToolOutcome::fail("user_id is required");
                }
                let style = self.learning_style(&user_id);
                let pattern_count = self.memory.pattern_count(&user_id);
                let adjustment = strategy::adapt(style, pattern_count, &performance);
                ToolOutcome::ok(json!({
                    "user_id": user_id,
                    "topic": topic,
                    "strategy": adjustment,
                    "is_struggling": adjustment.is_struggling,
                }))
            }

            ToolRequest::ConductAssessment {
                user_id,
                topic,
                assessment_type,
            } => match self.memory.record_assessment(&user_id, &topic, &assessment_type) {
                Ok(request) => ToolOutcome::ok_with_message(
                    format!("Assessment coordinated for topic: {topic}"),
                    json!({
                        "assessment": request,
                        "instruction": "Route to the assessment_checker specialist to conduct it",
                    }),
                ),
                Err(e) => ToolOutcome::fail(e.to_string()),
            },

            ToolRequest::CreateUserProfile {
                user_id,
                topic,
                narrative,
            } => {
                let profile =
                    match build_profile(self.classifier.as_ref(), &user_id, &topic, &narrative) {
                        Ok(profile) => profile,
                        Err(e) => return ToolOutcome::fail(e.to_string()),
                    };
                if let Err(e) = self.profiles.store(profile.clone()) {
                    return ToolOutcome::fail(e.to_string());
                }
                ToolOutcome::ok(json!({ "profile": profile }))
            }

            ToolRequest::GetUserProfile { user_id } => {
                if user_id.trim().is_empty() {
                    return ToolOutcome::fail("user_id is required");
                }
                match self.profiles.get(&user_id) {
                    Some(profile) => ToolOutcome::ok(json!({ "profile": profile })),
                    None => ToolOutcome::ok_with_message(
                        "No profile stored; balanced defaults assumed",
                        json!({ "profile": Value::Null }),
                    ),
                }
            }
        }
    }

    /// Handle one user message end to end.
    ///
    /// The specialist call is the only suspension point. On collaborator
    /// failure or timeout the reply degrades and no per-user state changes.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn handle_message(&self, request: ChatRequest) -> Result<TutorReply> {
        if request.user_id.trim().is_empty() {
            return Err(anyhow!("user_id is required"));
        }
        if request.message.trim().is_empty() {
            return Err(anyhow!("message must not be empty"));
        }

        let memory = self.memory.snapshot(&request.user_id);
        let progress = self.progress.snapshot(&request.user_id);

        let autonomy = self.resolve_autonomy(&request.user_id);
        let signal = request.signal.clone().unwrap_or_else(|| InterventionSignal {
            situation: "conversation".to_string(),
            ..Default::default()
        });
        let intervention = policy::decide(autonomy, &signal, &self.policy);

        let intent = self.router.route(&request.message);
        let specialist_name = intent.specialist_name();

        let specialist = {
            let registry = self.specialists.read().await;
            registry.get(specialist_name).cloned()
        };

        let Some(specialist) = specialist else {
            warn!(specialist_name, "No specialist registered for intent");
            return Ok(Self::degraded_reply(specialist_name, intent, intervention));
        };

        let context = json!({
            "user_id": request.user_id,
            "progress_summary": progress.summary,
            "completion_rate": progress.completion_rate,
            "preferences": memory.preferences,
            "intervention": intervention,
        });

        let invocation = tokio::time::timeout(
            self.specialist_timeout,
            specialist.invoke(&request.message, &context),
        )
        .await;

        let reply_text = match invocation {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(specialist_name, error = %e, "Specialist call failed");
                return Ok(Self::degraded_reply(specialist_name, intent, intervention));
            }
            Err(_) => {
                warn!(specialist_name, "Specialist call timed out");
                return Ok(Self::degraded_reply(specialist_name, intent, intervention));
            }
        };

        // Commit only now that the round trip succeeded.
        let summary = format!(
            "{}: {}",
            specialist_name,
            truncate(&request.message, 120)
        );
        let interaction_count = self.memory.update(
            &request.user_id,
            MemoryUpdate {
                preferences: None,
                interaction_summary: Some(summary),
            },
        )?;

        let reply = if intervention.should_intervene {
            format!("{}\n\n{}", reply_text, intervention.action)
        } else {
            reply_text
        };

        Ok(TutorReply {
            success: true,
            reply,
            specialist: Some(specialist_name.to_string()),
            intent,
            intervention,
            interaction_count: Some(interaction_count),
        })
    }

    fn degraded_reply(
        specialist_name: &str,
        intent: Intent,
        intervention: crate::policy::InterventionRecommendation,
    ) -> TutorReply {
        TutorReply {
            success: false,
            reply: format!(
                "I couldn't reach the {} specialist right now. Let's keep going; please try that request again in a moment.",
                specialist_name.replace('_', " ")
            ),
            specialist: None,
            intent,
            intervention,
            interaction_count: None,
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ScriptedSpecialist;
    use crate::policy::InterventionLevel;
    use async_trait::async_trait;

    struct FailingSpecialist;

    #[async_trait]
    impl Specialist for FailingSpecialist {
        fn name(&self) -> &str {
            "concept_explainer"
        }

        fn specialty(&self) -> &str {
            "concept explanation"
        }

        async fn invoke(&self, _prompt: &str, _context: &Value) -> Result<String> {
            Err(anyhow!("upstream unavailable"))
        }
    }

    struct StalledSpecialist;

    #[async_trait]
    impl Specialist for StalledSpecialist {
        fn name(&self) -> &str {
            "concept_explainer"
        }

        fn specialty(&self) -> &str {
            "concept explanation"
        }

        async fn invoke(&self, _prompt: &str, _context: &Value) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    fn tutor() -> Tutor {
        Tutor::new(PolicyConfig::default(), 50, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn routes_to_registered_specialist_and_commits_memory() {
        let tutor = tutor();
        tutor
            .register_specialist(Arc::new(ScriptedSpecialist::with_replies(
                "concept_explainer",
                "concept explanation",
                vec!["A loop repeats a block of code.".to_string()],
            )))
            .await;

        let reply = tutor
            .handle_message(ChatRequest {
                user_id: "u1".to_string(),
                message: "what is a loop?".to_string(),
                signal: None,
            })
            .await
            .unwrap();

        assert!(reply.success);
        assert_eq!(reply.intent, Intent::ExplainConcept);
        assert_eq!(reply.interaction_count, Some(1));
        assert!(reply.reply.contains("repeats"));
        assert_eq!(tutor.memory().snapshot("u1").interaction_count, 1);
        assert_eq!(tutor.memory().pattern_count("u1"), 1);
    }

    #[tokio::test]
    async fn failed_specialist_leaves_memory_untouched() {
        let tutor = tutor();
        tutor.register_specialist(Arc::new(FailingSpecialist)).await;

        let reply = tutor
            .handle_message(ChatRequest {
                user_id: "u1".to_string(),
                message: "what is a loop?".to_string(),
                signal: None,
            })
            .await
            .unwrap();

        assert!(!reply.success);
        assert!(reply.interaction_count.is_none());
        assert_eq!(tutor.memory().snapshot("u1").interaction_count, 0);
        assert_eq!(tutor.memory().pattern_count("u1"), 0);
    }

    #[tokio::test]
    async fn timed_out_specialist_degrades_without_commit() {
        let tutor = tutor();
        tutor.register_specialist(Arc::new(StalledSpecialist)).await;

        let reply = tutor
            .handle_message(ChatRequest {
                user_id: "u1".to_string(),
                message: "explain recursion".to_string(),
                signal: None,
            })
            .await
            .unwrap();

        assert!(!reply.success);
        assert_eq!(tutor.memory().snapshot("u1").interaction_count, 0);
    }

    #[tokio::test]
    async fn missing_specialist_yields_degraded_reply() {
        let tutor = tutor();

        let reply = tutor
            .handle_message(ChatRequest {
                user_id: "u1".to_string(),
                message: "please review my code".to_string(),
                signal: None,
            })
            .await
            .unwrap();

        assert!(!reply.success);
        assert_eq!(reply.intent, Intent::ReviewCode);
        assert!(reply.reply.contains("code reviewer"));
    }

    #[tokio::test]
    async fn intervention_signal_flows_into_reply() {
        let tutor = tutor();
        tutor.register_default_roster().await;

        let reply = tutor
            .handle_message(ChatRequest {
                user_id: "u1".to_string(),
                message: "I don't get this".to_string(),
                signal: Some(InterventionSignal {
                    situation: "stuck".to_string(),
                    time_stuck_minutes: Some(20.0),
                    error_count: None,
                }),
            })
            .await
            .unwrap();

        assert!(reply.success);
        assert!(reply.intervention.should_intervene);
        assert_eq!(reply.intervention.level, InterventionLevel::High);
        assert!(reply.reply.contains("Immediate intervention"));
    }

    #[tokio::test]
    async fn keyword_router_covers_all_intents() {
        let router = KeywordRouter;
        assert_eq!(router.route("please review my function"), Intent::ReviewCode);
        assert_eq!(router.route("quiz me on loops"), Intent::CheckAssessment);
        assert_eq!(router.route("build a learning path"), Intent::PlanCurriculum);
        assert_eq!(router.route("generate a notebook"), Intent::GenerateContent);
        assert_eq!(router.route("assess me first"), Intent::AssessUser);
        assert_eq!(router.route("what is ownership?"), Intent::ExplainConcept);
    }

    #[tokio::test]
    async fn update_user_memory_routes_progress_through_tracker() {
        let tutor = tutor();

        let outcome = tutor.execute_tool(ToolRequest::UpdateUserMemory {
            user_id: "u1".to_string(),
            preferences: None,
            progress_update: Some(vec![
                TopicUpdate {
                    topic: "loops".to_string(),
                    mastery_level: "struggling".to_string(),
                },
                TopicUpdate {
                    topic: "loops".to_string(),
                    mastery_level: "mastered".to_string(),
                },
            ]),
            interaction_summary: None,
        });
        assert!(outcome.success);
        assert_eq!(outcome.data["interaction_count"], 1);

        let record = tutor.progress().record("u1");
        assert!(record.mastered.contains("loops"));
        assert!(!record.struggling.contains("loops"));
        assert!((record.completion_rate - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn get_user_memory_returns_progress_alongside_memory() {
        let tutor = tutor();
        tutor
            .execute_tool(ToolRequest::TrackProgress {
                user_id: "u2".to_string(),
                topic: "loops".to_string(),
                mastery_level: "mastered".to_string(),
                notes: None,
            });
        tutor.execute_tool(ToolRequest::UpdateUserMemory {
            user_id: "u2".to_string(),
            preferences: None,
            progress_update: None,
            interaction_summary: Some("first session".to_string()),
        });

        let outcome = tutor.execute_tool(ToolRequest::GetUserMemory {
            user_id: "u2".to_string(),
        });
        assert!(outcome.success);
        assert_eq!(outcome.data["memory"]["interaction_count"], 1);
        assert_eq!(outcome.data["memory"]["patterns"][0]["summary"], "first session");
        assert_eq!(outcome.data["progress"]["mastered"][0], "loops");
        assert_eq!(outcome.data["progress"]["completion_rate"], 1.0);
    }

    #[tokio::test]
    async fn invalid_mastery_level_is_a_structured_failure() {
        let tutor = tutor();
        let outcome = tutor.execute_tool(ToolRequest::TrackProgress {
            user_id: "u1".to_string(),
            topic: "loops".to_string(),
            mastery_level: "expert".to_string(),
            notes: None,
        });
        assert!(!outcome.success);
        assert!(outcome.message.unwrap().contains("Invalid mastery_level"));
    }

    #[tokio::test]
    async fn should_intervene_tool_uses_stored_autonomy() {
        let tutor = tutor();
        tutor.execute_tool(ToolRequest::UpdateUserMemory {
            user_id: "u3".to_string(),
            preferences: Some(HashMap::from([(
                "autonomy_level".to_string(),
                json!(0.8),
            )])),
            progress_update: None,
            interaction_summary: None,
        });

        let outcome = tutor.execute_tool(ToolRequest::ShouldIntervene {
            user_id: "u3".to_string(),
            situation: "exploring".to_string(),
            time_stuck_minutes: Some(2.0),
            error_count: None,
        });
        assert!(outcome.success);
        assert_eq!(outcome.data["recommendation"]["should_intervene"], false);
        assert_eq!(outcome.data["recommendation"]["level"], "none");
    }

    #[tokio::test]
    async fn profile_tools_roundtrip() {
        let tutor = tutor();

        let created = tutor.execute_tool(ToolRequest::CreateUserProfile {
            user_id: "u5".to_string(),
            topic: "rust".to_string(),
            narrative: "Intermediate, hands-on, 6 hours per week, self-directed explorer."
                .to_string(),
        });
        assert!(created.success);

        let fetched = tutor.execute_tool(ToolRequest::GetUserProfile {
            user_id: "u5".to_string(),
        });
        assert!(fetched.success);
        assert_eq!(fetched.data["profile"]["user_id"], "u5");

        let missing = tutor.execute_tool(ToolRequest::GetUserProfile {
            user_id: "ghost".to_string(),
        });
        assert!(missing.success);
        assert!(missing.data["profile"].is_null());
    }
}
