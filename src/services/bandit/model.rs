use std::collections::BTreeMap;

use chrono::Utc;
use ndarray::Array1;
use rand::Rng;
use tracing::debug;

use super::arm::ArmModel;
use super::store::ModelSnapshot;
use super::{binarize, BanditError, BanditResult};
use crate::models::{Arm, Candidate};
use crate::services::context::{fit_to_dim, CONTEXT_DIM};
use crate::services::genre;

/// Score reported when there is no evidence to rank with
pub const NEUTRAL_SCORE: f64 = 0.5;

/// LinUCB bandit over a fixed set of genre arms for one scope
#[derive(Debug, Clone)]
pub struct BanditModel {
    arms: Vec<Arm>,
    alpha: f64,
    context_dim: usize,
    n_updates: u64,
    is_fitted: bool,
    arm_models: BTreeMap<Arm, ArmModel>,
}

impl Default for BanditModel {
    fn default() -> Self {
        Self::new(Arm::ALL.to_vec(), 1.0, CONTEXT_DIM)
    }
}

impl BanditModel {
    pub fn new(arms: Vec<Arm>, alpha: f64, context_dim: usize) -> Self {
        let arm_models = fresh_arms(&arms, context_dim);

        Self {
            arms,
            alpha,
            context_dim,
            n_updates: 0,
            is_fitted: false,
            arm_models,
        }
    }

    /// Fresh model over every arm with the given exploration strength
    pub fn with_alpha(alpha: f64) -> Self {
        Self::new(Arm::ALL.to_vec(), alpha, CONTEXT_DIM)
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn context_dim(&self) -> usize {
        self.context_dim
    }

    pub fn n_updates(&self) -> u64 {
        self.n_updates
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Picks the candidate whose arm has the highest upper confidence bound
    ///
    /// Before the first update every candidate is equally unknown, so the pick
    /// is uniformly random with a neutral score. Ties go to the earliest
    /// candidate.
    pub fn select(&self, context: &[f64], candidates: &[Candidate]) -> BanditResult<(usize, f64)> {
        if candidates.is_empty() {
            return Err(BanditError::InvalidArgument(
                "No candidates provided".to_string(),
            ));
        }

        if !self.is_fitted {
            let index = rand::thread_rng().gen_range(0..candidates.len());
            return Ok((index, NEUTRAL_SCORE));
        }

        let context = fit_to_dim(context, self.context_dim);
        let mut arm_scores: BTreeMap<Arm, f64> = BTreeMap::new();
        let mut best: Option<(usize, f64)> = None;

        for (index, candidate) in candidates.iter().enumerate() {
            let arm = genre::arm_for(candidate);
            let score = *arm_scores
                .entry(arm)
                .or_insert_with(|| self.arm_score(arm, &context));

            if !score.is_finite() {
                return Err(BanditError::ModelUnavailable(format!(
                    "non-finite score for arm {}",
                    arm
                )));
            }

            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((index, score)),
            }
        }

        let (index, score) = best.ok_or_else(|| {
            BanditError::ModelUnavailable("no candidate could be scored".to_string())
        })?;
        debug!(index = index, score = score, arms = arm_scores.len(), "Bandit selection");
        Ok((index, score))
    }

    fn arm_score(&self, arm: Arm, context: &Array1<f64>) -> f64 {
        self.arm_models
            .get(&arm)
            .map(|model| model.expectation(context.view(), self.alpha))
            .unwrap_or(NEUTRAL_SCORE)
    }

    /// Learns from the reward observed for a shown candidate
    pub fn update(&mut self, context: &[f64], candidate: &Candidate, reward: f64) -> BanditResult<()> {
        let arm = genre::arm_for(candidate);
        let context = fit_to_dim(context, self.context_dim);
        self.train(arm, &context, reward)?;

        self.is_fitted = true;
        self.n_updates += 1;
        Ok(())
    }

    /// Bootstraps the model from a batch of past decisions
    ///
    /// The batch replaces this model's history: every arm is reset before the
    /// batch is replayed, and `n_updates` becomes the batch size.
    pub fn warm_start(
        &mut self,
        decisions: &[Arm],
        rewards: &[f64],
        contexts: &[Array1<f64>],
    ) -> BanditResult<()> {
        if decisions.is_empty() {
            return Ok(());
        }
        if decisions.len() != rewards.len() || decisions.len() != contexts.len() {
            return Err(BanditError::InvalidArgument(format!(
                "warm start needs equal lengths, got {} decisions, {} rewards, {} contexts",
                decisions.len(),
                rewards.len(),
                contexts.len()
            )));
        }
        if let Some(unknown) = decisions.iter().find(|arm| !self.arm_models.contains_key(arm)) {
            return Err(BanditError::InvalidArgument(format!(
                "arm {} is not part of this model",
                unknown
            )));
        }

        self.arm_models = fresh_arms(&self.arms, self.context_dim);
        for ((arm, reward), context) in decisions.iter().zip(rewards).zip(contexts) {
            let context = fit_to_dim(&context.to_vec(), self.context_dim);
            self.train(*arm, &context, *reward)?;
        }

        self.is_fitted = true;
        self.n_updates = decisions.len() as u64;
        Ok(())
    }

    fn train(&mut self, arm: Arm, context: &Array1<f64>, reward: f64) -> BanditResult<()> {
        let model = self.arm_models.get_mut(&arm).ok_or_else(|| {
            BanditError::InvalidArgument(format!("arm {} is not part of this model", arm))
        })?;
        model.update(context.view(), binarize(reward));
        Ok(())
    }

    /// Full state for persistence
    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            arms: self.arms.clone(),
            alpha: self.alpha,
            context_dim: self.context_dim,
            n_updates: self.n_updates,
            is_fitted: self.is_fitted,
            saved_at: Some(Utc::now()),
            arm_states: Some(
                self.arm_models
                    .iter()
                    .map(|(arm, model)| (*arm, model.state()))
                    .collect(),
            ),
        }
    }

    /// Restores a model exactly from a full snapshot
    pub fn from_snapshot(snapshot: ModelSnapshot) -> BanditResult<Self> {
        let ModelSnapshot {
            arms,
            alpha,
            context_dim,
            n_updates,
            is_fitted,
            arm_states,
            ..
        } = snapshot;

        let mut states = arm_states.ok_or_else(|| {
            BanditError::PersistenceUnavailable("snapshot carries no arm states".to_string())
        })?;

        let mut arm_models = BTreeMap::new();
        for arm in &arms {
            let state = states.remove(arm).ok_or_else(|| {
                BanditError::PersistenceUnavailable(format!("snapshot is missing arm {}", arm))
            })?;
            arm_models.insert(*arm, ArmModel::from_state(state, context_dim)?);
        }

        Ok(Self {
            arms,
            alpha,
            context_dim,
            n_updates,
            is_fitted,
            arm_models,
        })
    }

    /// Restores configuration and counters from a metadata-only snapshot
    ///
    /// The learned weights are gone, so the result is freshly initialised and
    /// unfitted; only the update counter survives.
    pub fn from_metadata(snapshot: &ModelSnapshot) -> Self {
        let mut model = Self::new(snapshot.arms.clone(), snapshot.alpha, snapshot.context_dim);
        model.n_updates = snapshot.n_updates;
        model
    }
}

fn fresh_arms(arms: &[Arm], context_dim: usize) -> BTreeMap<Arm, ArmModel> {
    arms.iter()
        .map(|arm| (*arm, ArmModel::new(context_dim)))
        .collect()
}
