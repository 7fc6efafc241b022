use std::sync::Arc;

use crate::services::HierarchicalBandit;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bandit: Arc<HierarchicalBandit>,
}

impl AppState {
    pub fn new(bandit: Arc<HierarchicalBandit>) -> Self {
        Self { bandit }
    }
}
