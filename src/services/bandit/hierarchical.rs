use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::model::{BanditModel, NEUTRAL_SCORE};
use super::remote::SnapshotSource;
use super::store::{ModelStore, Scope};
use super::{BanditError, BanditResult};
use crate::models::{Arm, Candidate};
use crate::services::context::{self, fit_to_dim, CONTEXT_DIM};
use crate::services::genre;

/// Updates after which a user's own model reaches full blend weight
const BLEND_SATURATION_UPDATES: f64 = 50.0;

/// Cap on how much a user's model can outweigh the global one
const MAX_USER_BLEND: f64 = 0.7;

#[derive(Debug, Clone)]
pub struct BanditSettings {
    /// Exploration strength for newly created models
    pub alpha: f64,
    /// History a user needs before their own model is consulted
    pub min_user_updates: u64,
}

impl Default for BanditSettings {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            min_user_updates: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BanditSummary {
    pub global_updates: u64,
    pub global_fitted: bool,
    pub users_loaded: usize,
}

/// Weight given to a user's model once it is consulted
pub fn blend_weight(n_updates: u64) -> f64 {
    (n_updates as f64 / BLEND_SATURATION_UPDATES).min(MAX_USER_BLEND)
}

/// Global bandit plus lazily loaded per-user bandits
///
/// The global model sits behind a single reader/writer lock so selections run
/// concurrently and updates never interleave with each other. User models live
/// in a sharded map, each behind its own lock, so different users never wait
/// on one another. Every update is written through to the store.
pub struct HierarchicalBandit {
    global: RwLock<BanditModel>,
    users: DashMap<String, Arc<RwLock<BanditModel>>>,
    store: ModelStore,
    settings: BanditSettings,
}

impl HierarchicalBandit {
    /// Builds the engine from local artifacts only
    pub fn new(store: ModelStore, settings: BanditSettings) -> Self {
        let global = store.load_global(None, settings.alpha);
        Self::from_parts(global, store, settings)
    }

    /// Builds the engine, preferring a remote global snapshot when one is available
    pub async fn init(
        store: ModelStore,
        settings: BanditSettings,
        remote: Option<&dyn SnapshotSource>,
    ) -> Self {
        let remote_snapshot = match remote {
            Some(source) => match source.fetch_global().await {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Remote snapshot unavailable");
                    None
                }
            },
            None => None,
        };

        let global = store.load_global(remote_snapshot.as_deref(), settings.alpha);
        Self::from_parts(global, store, settings)
    }

    fn from_parts(global: BanditModel, store: ModelStore, settings: BanditSettings) -> Self {
        info!(
            n_updates = global.n_updates(),
            fitted = global.is_fitted(),
            models_dir = %store.dir().display(),
            "Hierarchical bandit ready"
        );

        Self {
            global: RwLock::new(global),
            users: DashMap::new(),
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &BanditSettings {
        &self.settings
    }

    /// Picks a candidate for a user
    ///
    /// The global model always ranks. Once the user has a fitted model with
    /// `min_user_updates` of their own history, it ranks too and wins when its
    /// blended score beats the global one. Only an empty candidate list is
    /// reported as an error; model failures degrade to the global pick or a
    /// random one.
    pub fn select(
        &self,
        user_id: &str,
        context: &[f64],
        candidates: &[Candidate],
    ) -> BanditResult<(usize, f64)> {
        if candidates.is_empty() {
            return Err(BanditError::InvalidArgument(
                "No candidates provided".to_string(),
            ));
        }

        let (global_index, global_score) = match self.global.read().select(context, candidates) {
            Ok(pick) => pick,
            Err(e) => {
                warn!(error = %e, "Global selection failed, picking at random");
                let index = rand::thread_rng().gen_range(0..candidates.len());
                return Ok((index, NEUTRAL_SCORE));
            }
        };

        let user_model = self.user_model(user_id);
        let user = user_model.read();
        // A user model restored from metadata alone has a count but no weights
        if !user.is_fitted() || user.n_updates() < self.settings.min_user_updates {
            return Ok((global_index, global_score));
        }

        match user.select(context, candidates) {
            Ok((user_index, user_score)) => {
                let blend = blend_weight(user.n_updates());
                if user_score * blend > global_score * (1.0 - blend) {
                    debug!(
                        user_id = %user_id,
                        blend = blend,
                        user_score = user_score,
                        global_score = global_score,
                        "User model overrides global pick"
                    );
                    Ok((user_index, user_score))
                } else {
                    Ok((global_index, global_score))
                }
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User selection failed, using global pick");
                Ok((global_index, global_score))
            }
        }
    }

    /// Feeds a reward to the global model and the user's model
    ///
    /// The two halves are independent: a failure in one is logged and does not
    /// stop the other.
    pub fn update(&self, user_id: &str, context: &[f64], candidate: &Candidate, reward: f64) {
        {
            let mut global = self.global.write();
            if let Err(e) = global.update(context, candidate, reward) {
                error!(error = %e, "Global bandit update failed");
            } else if let Err(e) = self.store.save(&Scope::Global, &global) {
                error!(error = %e, "Failed to persist global bandit");
            }
        }

        let user_model = self.user_model(user_id);
        let mut user = user_model.write();
        if let Err(e) = user.update(context, candidate, reward) {
            error!(user_id = %user_id, error = %e, "User bandit update failed");
        } else if let Err(e) = self.store.save(&Scope::User(user_id.to_string()), &user) {
            error!(user_id = %user_id, error = %e, "Failed to persist user bandit");
        }
    }

    /// Seeds a user's model from items they picked during onboarding
    ///
    /// Every item counts as a positive outcome in the given context, or in a
    /// calm neutral one when none is given.
    pub fn warm_start_user(
        &self,
        user_id: &str,
        items: &[Candidate],
        context: Option<&[f64]>,
    ) -> BanditResult<()> {
        if items.is_empty() {
            return Ok(());
        }

        let context = match context {
            Some(raw) => fit_to_dim(raw, CONTEXT_DIM),
            None => context::neutral(),
        };
        let decisions: Vec<Arm> = items.iter().map(genre::arm_for).collect();
        let rewards = vec![1.0; items.len()];
        let contexts = vec![context; items.len()];

        let user_model = self.user_model(user_id);
        let mut user = user_model.write();
        user.warm_start(&decisions, &rewards, &contexts)?;
        self.store.save(&Scope::User(user_id.to_string()), &user)?;

        info!(user_id = %user_id, items = items.len(), "Warm-started user bandit");
        Ok(())
    }

    /// Flushes every model held in memory
    pub fn close(&self) {
        if let Err(e) = self.store.save(&Scope::Global, &self.global.read()) {
            error!(error = %e, "Failed to persist global bandit on shutdown");
        }

        for entry in self.users.iter() {
            let scope = Scope::User(entry.key().clone());
            if let Err(e) = self.store.save(&scope, &entry.value().read()) {
                error!(user_id = %entry.key(), error = %e, "Failed to persist user bandit on shutdown");
            }
        }

        info!(users = self.users.len(), "Bandit models flushed");
    }

    pub fn summary(&self) -> BanditSummary {
        let global = self.global.read();
        BanditSummary {
            global_updates: global.n_updates(),
            global_fitted: global.is_fitted(),
            users_loaded: self.users.len(),
        }
    }

    /// Returns the user's model, loading it from the store or creating it on first use
    fn user_model(&self, user_id: &str) -> Arc<RwLock<BanditModel>> {
        if let Some(model) = self.users.get(user_id) {
            return Arc::clone(model.value());
        }

        // Disk reads stay outside the shard lock; a concurrent loader may win
        let loaded = self
            .store
            .load_user(user_id)
            .unwrap_or_else(|| BanditModel::with_alpha(self.settings.alpha));

        let entry = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(loaded)));
        Arc::clone(entry.value())
    }
}
