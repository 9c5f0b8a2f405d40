//! Core types, moderation policy, and process configuration.

pub mod classification;
pub mod config;
pub mod policy;
pub mod review;

pub use classification::{Action, Candidate, ClassificationResult, TopSelection, TOP_K};
pub use config::{AppConfig, ClassifierConfig, ConfigError, SchedulerConfig};
pub use policy::{ApprovalRule, decide};
pub use review::{NewReview, Review, ReviewId, ReviewStatus};
