//! Batch processing for running pre-configured tutoring sessions.
//!
//! A session file describes a sequence of user interactions to replay against
//! the tutor, with result aggregation and an optional JSON report.

use crate::{
    orchestrator::{ChatRequest, Tutor},
    policy::InterventionSignal,
    settings::Settings,
};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::{error, info, instrument, warn};

/// Session job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session metadata
    pub session: SessionMetadata,

    /// Interactions to replay, in order
    pub interactions: Vec<InteractionConfig>,

    /// Global settings for the session run
    #[serde(default)]
    pub settings: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub name: String,
    pub description: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Unique interaction identifier
    pub id: String,

    pub user_id: String,

    pub message: String,

    /// Optional situation signals accompanying the message
    #[serde(default)]
    pub signal: Option<InterventionSignal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Output file for the JSON report
    pub output_file: Option<PathBuf>,

    /// Whether to stop on the first degraded reply
    #[serde(default)]
    pub fail_fast: bool,
}

/// Result of a single replayed interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionResult {
    pub interaction_id: String,
    pub user_id: String,
    pub status: InteractionStatus,
    pub specialist: Option<String>,
    pub reply: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum InteractionStatus {
    Success,
    Degraded,
    Failed,
    Skipped,
}

/// Complete session replay result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_name: String,
    pub status: SessionStatus,
    pub total_interactions: usize,
    pub successful: usize,
    pub degraded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_duration_ms: u64,
    pub interaction_results: Vec<InteractionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Success,
    PartialSuccess,
    Failed,
}

/// Replay a session from a configuration file
#[instrument(skip(settings))]
pub async fn run(config_path: PathBuf, settings: Settings) -> Result<()> {
    info!("Starting session replay from config: {:?}", config_path);

    let config = load_session_config(&config_path)
        .context("Failed to load session configuration")?;

    info!("Loaded session: {}", config.session.name);

    let output_file = config.settings.output_file.clone();

    let tutor = Arc::new(Tutor::new(
        settings.policy.clone(),
        settings.memory.pattern_capacity,
        std::time::Duration::from_secs(settings.orchestrator.specialist_timeout_seconds),
    ));
    tutor.register_default_roster().await;

    let start_time = Instant::now();
    let result = replay_session(&tutor, config).await;
    info!(
        "Session replay completed in {:?}",
        start_time.elapsed()
    );

    print_session_summary(&result);

    if let Some(ref path) = output_file {
        save_session_results(&result, path).context("Failed to save session results")?;
    }

    match result.status {
        SessionStatus::Success => Ok(()),
        SessionStatus::PartialSuccess => {
            warn!("Session completed with some degraded interactions");
            Ok(())
        }
        SessionStatus::Failed => {
            error!("Session replay failed");
            Err(anyhow!("Session replay failed: {}", result.session_name))
        }
    }
}

/// Load session configuration from TOML file
fn load_session_config(config_path: &PathBuf) -> Result<SessionConfig> {
    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

    let config: SessionConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse TOML config: {:?}", config_path))?;

    validate_session_config(&config)?;

    Ok(config)
}

/// Validate session configuration
fn validate_session_config(config: &SessionConfig) -> Result<()> {
    if config.interactions.is_empty() {
        return Err(anyhow!(
            "Session configuration must contain at least one interaction"
        ));
    }

    let mut ids = std::collections::HashSet::new();
    for interaction in &config.interactions {
        if !ids.insert(&interaction.id) {
            return Err(anyhow!("Duplicate interaction ID: {}", interaction.id));
        }
        if interaction.user_id.trim().is_empty() {
            return Err(anyhow!(
                "Interaction {} has an empty user_id",
                interaction.id
            ));
        }
    }

    Ok(())
}

/// Replay interactions sequentially; conversation order matters, so there is
/// no concurrency here.
async fn replay_session(tutor: &Tutor, config: SessionConfig) -> SessionResult {
    let start_time = Instant::now();
    let total = config.interactions.len();
    let fail_fast = config.settings.fail_fast;

    let mut results = Vec::with_capacity(total);
    let mut interactions = config.interactions.into_iter();

    for interaction in interactions.by_ref() {
        info!("Replaying interaction: {}", interaction.id);
        let result = replay_single_interaction(tutor, &interaction).await;
        let stop = fail_fast && result.status != InteractionStatus::Success;
        results.push(result);
        if stop {
            error!("Stopping early due to fail_fast");
            break;
        }
    }

    for interaction in interactions {
        results.push(InteractionResult {
            interaction_id: interaction.id,
            user_id: interaction.user_id,
            status: InteractionStatus::Skipped,
            specialist: None,
            reply: None,
            error: None,
            duration_ms: 0,
        });
    }

    let successful = count(&results, InteractionStatus::Success);
    let degraded = count(&results, InteractionStatus::Degraded);
    let failed = count(&results, InteractionStatus::Failed);
    let skipped = count(&results, InteractionStatus::Skipped);

    let status = if failed == 0 && degraded == 0 && skipped == 0 {
        SessionStatus::Success
    } else if successful > 0 {
        SessionStatus::PartialSuccess
    } else {
        SessionStatus::Failed
    };

    SessionResult {
        session_name: config.session.name,
        status,
        total_interactions: total,
        successful,
        degraded,
        failed,
        skipped,
        total_duration_ms: start_time.elapsed().as_millis() as u64,
        interaction_results: results,
    }
}

fn count(results: &[InteractionResult], status: InteractionStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

async fn replay_single_interaction(
    tutor: &Tutor,
    interaction: &InteractionConfig,
) -> InteractionResult {
    let start_time = Instant::now();

    let request = ChatRequest {
        user_id: interaction.user_id.clone(),
        message: interaction.message.clone(),
        signal: interaction.signal.clone(),
    };

    match tutor.handle_message(request).await {
        Ok(reply) => {
            let status = if reply.success {
                InteractionStatus::Success
            } else {
                warn!("Interaction {} degraded", interaction.id);
                InteractionStatus::Degraded
            };
            InteractionResult {
                interaction_id: interaction.id.clone(),
                user_id: interaction.user_id.clone(),
                status,
                specialist: reply.specialist,
                reply: Some(reply.reply),
                error: None,
                duration_ms: start_time.elapsed().as_millis() as u64,
            }
        }
        Err(e) => {
            warn!("Interaction {} failed: {}", interaction.id, e);
            InteractionResult {
                interaction_id: interaction.id.clone(),
                user_id: interaction.user_id.clone(),
                status: InteractionStatus::Failed,
                specialist: None,
                reply: None,
                error: Some(e.to_string()),
                duration_ms: start_time.elapsed().as_millis() as u64,
            }
        }
    }
}

/// Print session replay summary
fn print_session_summary(result: &SessionResult) {
    println!("\n=== Session Replay Summary ===");
    println!("Session: {}", result.session_name);
    println!("Status: {:?}", result.status);
    println!("Total Interactions: {}", result.total_interactions);
    println!("Successful: {}", result.successful);
    println!("Degraded: {}", result.degraded);
    println!("Failed: {}", result.failed);
    println!("Skipped: {}", result.skipped);
    println!("Duration: {}ms", result.total_duration_ms);

    if result.failed > 0 || result.degraded > 0 {
        println!("\nProblem Interactions:");
        for interaction in &result.interaction_results {
            if interaction.status == InteractionStatus::Failed
                || interaction.status == InteractionStatus::Degraded
            {
                println!(
                    "  - {} ({:?}): {}",
                    interaction.interaction_id,
                    interaction.status,
                    interaction.error.as_deref().unwrap_or("degraded reply")
                );
            }
        }
    }
    println!("==============================\n");
}

/// Save session results to JSON file
fn save_session_results(result: &SessionResult, output_file: &PathBuf) -> Result<()> {
    let json =
        serde_json::to_string_pretty(result).context("Failed to serialize session results")?;

    std::fs::write(output_file, json)
        .with_context(|| format!("Failed to write results to: {:?}", output_file))?;

    info!("Session results saved to: {:?}", output_file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn interaction(id: &str, user_id: &str) -> InteractionConfig {
        InteractionConfig {
            id: id.to_string(),
            user_id: user_id.to_string(),
            message: "explain variables".to_string(),
            signal: None,
        }
    }

    #[test]
    fn rejects_duplicate_interaction_ids() {
        let config = SessionConfig {
            session: SessionMetadata {
                name: "test_session".to_string(),
                description: None,
                tags: vec![],
            },
            interactions: vec![interaction("i1", "u1"), interaction("i1", "u1")],
            settings: SessionSettings::default(),
        };
        assert!(validate_session_config(&config).is_err());
    }

    #[test]
    fn rejects_empty_interaction_list() {
        let config = SessionConfig {
            session: SessionMetadata {
                name: "empty".to_string(),
                description: None,
                tags: vec![],
            },
            interactions: vec![],
            settings: SessionSettings::default(),
        };
        assert!(validate_session_config(&config).is_err());
    }

    #[tokio::test]
    async fn loads_session_config_from_toml() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_session.toml");

        let config_content = r#"
[session]
name = "intro_session"
description = "Replay of a first-week session"

[settings]
fail_fast = false

[[interactions]]
id = "i1"
user_id = "student_1"
message = "What is a variable?"

[[interactions]]
id = "i2"
user_id = "student_1"
message = "I keep getting errors"

[interactions.signal]
situation = "debugging"
error_count = 4
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = load_session_config(&config_path).unwrap();
        assert_eq!(config.session.name, "intro_session");
        assert_eq!(config.interactions.len(), 2);
        assert_eq!(
            config.interactions[1].signal.as_ref().unwrap().error_count,
            Some(4)
        );
    }

    #[tokio::test]
    async fn replays_interactions_in_order() {
        let tutor = Tutor::new(
            crate::policy::PolicyConfig::default(),
            50,
            std::time::Duration::from_secs(5),
        );
        tutor.register_default_roster().await;

        let config = SessionConfig {
            session: SessionMetadata {
                name: "run".to_string(),
                description: None,
                tags: vec![],
            },
            interactions: vec![interaction("i1", "u1"), interaction("i2", "u1")],
            settings: SessionSettings::default(),
        };

        let result = replay_session(&tutor, config).await;
        assert_eq!(result.status, SessionStatus::Success);
        assert_eq!(result.successful, 2);
        assert_eq!(tutor.memory().snapshot("u1").interaction_count, 2);
    }
}
