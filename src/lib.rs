//! Tutoring Platform - Core Library
//!
//! An adaptive tutoring orchestration platform built in Rust.

pub mod agent;
pub mod assessment;
pub mod batch;
pub mod cli;
pub mod memory;
pub mod orchestrator;
pub mod policy;
pub mod profile;
pub mod progress;
pub mod server;
pub mod settings;
pub mod storage;
pub mod strategy;
pub mod telemetry;

pub use agent::Specialist;
pub use orchestrator::Tutor;
