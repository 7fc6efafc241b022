//! Hierarchical LinUCB contextual bandit
//!
//! One learner per genre arm, grouped into a model per scope: a global model
//! shared by every user and a lazily loaded model per user. Selection blends
//! the two once a user has enough history of their own; feedback updates both.

pub mod arm;
pub mod hierarchical;
pub mod model;
pub mod remote;
pub mod store;

pub use arm::ArmModel;
pub use hierarchical::{BanditSettings, BanditSummary, HierarchicalBandit};
pub use model::BanditModel;
pub use remote::{HubSnapshotSource, SnapshotSource};
pub use store::{ModelStore, Scope};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BanditError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),
}

impl From<std::io::Error> for BanditError {
    fn from(e: std::io::Error) -> Self {
        BanditError::PersistenceUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for BanditError {
    fn from(e: serde_json::Error) -> Self {
        BanditError::PersistenceUnavailable(e.to_string())
    }
}

pub type BanditResult<T> = std::result::Result<T, BanditError>;

/// Rewards above this count as a positive outcome
pub const REWARD_THRESHOLD: f64 = 0.5;

/// Collapses a [0, 1] reward into the binary outcome the learners train on
pub fn binarize(reward: f64) -> f64 {
    if reward > REWARD_THRESHOLD {
        1.0
    } else {
        0.0
    }
}

/// Converts user feedback into a reward
///
/// Only the "brings back memories" signal is used for now.
pub fn calculate_reward(brings_back_memories: bool) -> f64 {
    if brings_back_memories {
        1.0
    } else {
        0.0
    }
}
