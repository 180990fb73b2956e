//! Admission feasibility and recommendation engine.
//!
//! `admission-engine` maps a raw examination score to a percentile band and
//! rank using versioned, atomically published models, resolves free-text
//! locations against known institution coordinates, and sorts candidate
//! programs into Safe, Moderate and Ambitious tiers ranked by a composite
//! quality score. Inference is deterministic: identical inputs against the
//! same model version always produce identical outputs.

pub mod config;
pub mod engine;
pub mod geo;
pub mod predictor;
pub mod records;
pub mod telemetry;
pub mod tiering;
pub mod trends;
pub mod types;

pub use config::{ConfigError, EngineConfig, TelemetryConfig};
pub use engine::AdmissionEngine;
pub use types::{Degradation, EngineError, RecommendationRequest, RecommendationResponse};
