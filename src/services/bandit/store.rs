use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::arm::ArmState;
use super::model::BanditModel;
use super::BanditResult;
use crate::models::Arm;

const FULL_SUFFIX: &str = "state.json";
const METADATA_SUFFIX: &str = "meta.json";

/// Which model an artifact belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    User(String),
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            // Percent-encoding is reversible and leaves no path separators
            Scope::User(id) => write!(f, "user_{}", urlencoding::encode(id)),
        }
    }
}

/// Serialized bandit model
///
/// Full artifacts carry `arm_states`; metadata artifacts leave it out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub arms: Vec<Arm>,
    pub alpha: f64,
    pub context_dim: usize,
    #[serde(default)]
    pub n_updates: u64,
    #[serde(default)]
    pub is_fitted: bool,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arm_states: Option<BTreeMap<Arm, ArmState>>,
}

impl ModelSnapshot {
    pub fn metadata(&self) -> Self {
        Self {
            arm_states: None,
            ..self.clone()
        }
    }
}

/// Directory of per-scope model artifacts
///
/// Each scope has a full artifact (`<scope>.state.json`) and a metadata-only
/// one (`<scope>.meta.json`). Loading walks a fallback chain; a broken link
/// is logged and skipped rather than reported.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> BanditResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, scope: &Scope, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", scope, suffix))
    }

    /// Writes both artifacts for a scope
    pub fn save(&self, scope: &Scope, model: &BanditModel) -> BanditResult<()> {
        let snapshot = model.snapshot();
        write_atomic(
            &self.path(scope, FULL_SUFFIX),
            &serde_json::to_vec(&snapshot)?,
        )?;
        write_atomic(
            &self.path(scope, METADATA_SUFFIX),
            &serde_json::to_vec(&snapshot.metadata())?,
        )?;

        debug!(scope = %scope, n_updates = model.n_updates(), "Saved bandit model");
        Ok(())
    }

    /// Loads a full artifact; `Ok(None)` when there is none
    pub fn load_full(&self, scope: &Scope) -> BanditResult<Option<BanditModel>> {
        match read_snapshot(&self.path(scope, FULL_SUFFIX))? {
            Some(snapshot) => Ok(Some(BanditModel::from_snapshot(snapshot)?)),
            None => Ok(None),
        }
    }

    /// Loads configuration and counters only; the weights start fresh
    pub fn load_metadata(&self, scope: &Scope) -> BanditResult<Option<BanditModel>> {
        Ok(read_snapshot(&self.path(scope, METADATA_SUFFIX))?
            .map(|snapshot| BanditModel::from_metadata(&snapshot)))
    }

    /// Local full state, then local metadata, then nothing
    pub fn load_user(&self, user_id: &str) -> Option<BanditModel> {
        let scope = Scope::User(user_id.to_string());
        self.load_local(&scope)
    }

    /// Remote snapshot, then local full state, then local metadata, then a fresh model
    pub fn load_global(&self, remote_snapshot: Option<&[u8]>, alpha: f64) -> BanditModel {
        if let Some(bytes) = remote_snapshot {
            match serde_json::from_slice::<ModelSnapshot>(bytes)
                .map_err(Into::into)
                .and_then(BanditModel::from_snapshot)
            {
                Ok(model) => {
                    info!(n_updates = model.n_updates(), "Loaded global bandit from remote snapshot");
                    return model;
                }
                Err(e) => warn!(error = %e, "Remote global snapshot unusable, falling back to local"),
            }
        }

        if let Some(model) = self.load_local(&Scope::Global) {
            return model;
        }

        info!(alpha = alpha, "Starting fresh global bandit");
        BanditModel::with_alpha(alpha)
    }

    fn load_local(&self, scope: &Scope) -> Option<BanditModel> {
        match self.load_full(scope) {
            Ok(Some(model)) => {
                info!(scope = %scope, n_updates = model.n_updates(), "Loaded bandit model (full state)");
                return Some(model);
            }
            Ok(None) => {}
            Err(e) => warn!(scope = %scope, error = %e, "Could not load full bandit state"),
        }

        match self.load_metadata(scope) {
            Ok(Some(model)) => {
                info!(scope = %scope, n_updates = model.n_updates(), "Loaded bandit metadata only");
                Some(model)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(scope = %scope, error = %e, "Could not load bandit metadata");
                None
            }
        }
    }
}

fn read_snapshot(path: &Path) -> BanditResult<Option<ModelSnapshot>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> BanditResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;
    use crate::services::context;
    use tempfile::tempdir;

    fn trained_model() -> BanditModel {
        let mut model = BanditModel::with_alpha(0.5);
        let ctx = context::build(0.6, "sadness", Some(1985), 0.4).to_vec();
        model.update(&ctx, &Candidate::song("Soul"), 1.0).unwrap();
        model.update(&ctx, &Candidate::movie("War"), 0.0).unwrap();
        model.update(&ctx, &Candidate::song("Folk"), 1.0).unwrap();
        model
    }

    #[test]
    fn test_scope_file_stems() {
        assert_eq!(Scope::Global.to_string(), "global");
        assert_eq!(Scope::User("42".to_string()).to_string(), "user_42");
        assert_eq!(
            Scope::User("../etc/passwd".to_string()).to_string(),
            "user_..%2Fetc%2Fpasswd"
        );
    }

    #[test]
    fn test_similar_user_ids_keep_separate_artifacts() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();

        assert_ne!(
            Scope::User("a.b".to_string()).to_string(),
            Scope::User("a_b".to_string()).to_string()
        );
        assert_ne!(
            Scope::User("a b".to_string()).to_string(),
            Scope::User("a+b".to_string()).to_string()
        );

        store.save(&Scope::User("a.b".to_string()), &trained_model()).unwrap();
        assert!(store.load_user("a_b").is_none());
        assert_eq!(store.load_user("a.b").unwrap().n_updates(), 3);
    }

    #[test]
    fn test_save_then_load_user() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let model = trained_model();

        store.save(&Scope::User("alice".to_string()), &model).unwrap();
        assert!(dir.path().join("user_alice.state.json").exists());
        assert!(dir.path().join("user_alice.meta.json").exists());

        let loaded = store.load_user("alice").unwrap();
        assert_eq!(loaded.n_updates(), 3);
        assert!(loaded.is_fitted());
        assert_eq!(loaded.alpha(), 0.5);

        let ctx = context::build(0.6, "sadness", Some(1985), 0.4).to_vec();
        let pool = vec![Candidate::movie("War"), Candidate::song("Blues")];
        assert_eq!(loaded.select(&ctx, &pool).unwrap().0, model.select(&ctx, &pool).unwrap().0);
    }

    #[test]
    fn test_metadata_artifact_omits_weights() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        store.save(&Scope::Global, &trained_model()).unwrap();

        let raw = fs::read_to_string(dir.path().join("global.meta.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("arm_states").is_none());
        assert_eq!(value["n_updates"], 3);
        assert_eq!(value["arms"][0], "drama");
    }

    #[test]
    fn test_corrupt_full_state_falls_back_to_metadata() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        store.save(&Scope::User("bob".to_string()), &trained_model()).unwrap();
        fs::write(dir.path().join("user_bob.state.json"), b"{ not json").unwrap();

        let loaded = store.load_user("bob").unwrap();
        assert_eq!(loaded.n_updates(), 3);
        assert_eq!(loaded.alpha(), 0.5);
        assert!(!loaded.is_fitted());
    }

    #[test]
    fn test_missing_user_is_none() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        assert!(store.load_user("nobody").is_none());
    }

    #[test]
    fn test_both_artifacts_corrupt_is_none() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        fs::write(dir.path().join("user_eve.state.json"), b"[]").unwrap();
        fs::write(dir.path().join("user_eve.meta.json"), b"garbage").unwrap();
        assert!(store.load_user("eve").is_none());
    }

    #[test]
    fn test_global_defaults_to_fresh_model() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        let model = store.load_global(None, 2.0);
        assert_eq!(model.alpha(), 2.0);
        assert_eq!(model.n_updates(), 0);
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_remote_snapshot_wins_over_local() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        store.save(&Scope::Global, &BanditModel::with_alpha(1.0)).unwrap();

        let remote = serde_json::to_vec(&trained_model().snapshot()).unwrap();
        let model = store.load_global(Some(&remote), 1.0);
        assert_eq!(model.n_updates(), 3);
        assert!(model.is_fitted());
    }

    #[test]
    fn test_bad_remote_snapshot_falls_back_to_local() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();
        store.save(&Scope::Global, &trained_model()).unwrap();

        let model = store.load_global(Some(b"<html>404</html>"), 1.0);
        assert_eq!(model.n_updates(), 3);
        assert!(model.is_fitted());
    }

    #[test]
    fn test_remote_metadata_only_is_rejected() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path()).unwrap();

        let remote = serde_json::to_vec(&trained_model().snapshot().metadata()).unwrap();
        let model = store.load_global(Some(&remote), 1.0);
        assert_eq!(model.n_updates(), 0);
    }
}
