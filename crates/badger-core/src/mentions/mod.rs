//! Mention recording, reply resolution, and escalation.

pub mod analyzer;
pub mod tracker;

pub use analyzer::{LineAnalysis, MentionAnalysis, MentionAnalyzer};
pub use tracker::{MentionTracker, ESCALATION_CREATOR, ESCALATION_PREFIX};
