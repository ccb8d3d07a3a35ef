//! State management for tracked gateways
//!
//! Manages the `.natgate/state.json` file, which maps gateway names from the
//! manifest to the remote ids the reconciler handed back.

use crate::error::{CloudError, Result};
use crate::model::{NatGatewayDescriptor, ReconciledState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".natgate";
const STATE_FILE: &str = "state.json";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// All tracked gateways
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Gateways indexed by manifest name
    pub gateways: BTreeMap<String, TrackedGateway>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            gateways: BTreeMap::new(),
        }
    }
}

impl StateFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a gateway
    pub fn set_gateway(&mut self, name: impl Into<String>, gateway: TrackedGateway) {
        self.gateways.insert(name.into(), gateway);
        self.updated_at = Utc::now();
    }

    /// Remove a gateway
    pub fn remove_gateway(&mut self, name: &str) -> Option<TrackedGateway> {
        let result = self.gateways.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    pub fn get_gateway(&self, name: &str) -> Option<&TrackedGateway> {
        self.gateways.get(name)
    }

    /// Find the manifest name tracking a remote id
    pub fn name_for_id(&self, id: &str) -> Option<&str> {
        self.gateways
            .iter()
            .find(|(_, g)| g.id == id)
            .map(|(name, _)| name.as_str())
    }
}

/// A single tracked gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedGateway {
    /// Remote NAT gateway id
    pub id: String,

    /// Descriptor the gateway was created from
    pub descriptor: NatGatewayDescriptor,

    /// Current status
    pub status: ResourceStatus,

    /// Last state read back from the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<ReconciledState>,

    /// When the gateway was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl TrackedGateway {
    pub fn new(id: impl Into<String>, descriptor: NatGatewayDescriptor) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            descriptor,
            status: ResourceStatus::Unknown,
            observed: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ResourceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_observed(mut self, observed: ReconciledState) -> Self {
        self.observed = Some(observed);
        self
    }

    /// Record a fresh read
    pub fn observe(&mut self, observed: ReconciledState) {
        self.status = ResourceStatus::Available;
        self.observed = Some(observed);
        self.updated_at = Utc::now();
    }
}

/// Status of a tracked gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Created and available
    Available,
    /// Created, but the wait did not complete; needs a read or delete
    Tainted,
    /// Status is unknown
    Unknown,
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceStatus::Available => write!(f, "available"),
            ResourceStatus::Tainted => write!(f, "tainted"),
            ResourceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// State manager for reading/writing state files
#[derive(Debug)]
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR)
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE)
    }

    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the current state
    pub async fn load(&self) -> Result<StateFile> {
        let path = self.state_path();
        if !path.exists() {
            tracing::debug!("State file not found, returning empty state");
            return Ok(StateFile::new());
        }

        let content = fs::read_to_string(&path).await?;
        let state: StateFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded state with {} gateways", state.gateways.len());
        Ok(state)
    }

    /// Save the state, keeping the previous file as a backup
    pub async fn save(&self, state: &StateFile) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path();
        let backup = self.backup_path();

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!("Saved state with {} gateways", state.gateways.len());
        Ok(())
    }

    /// Acquire a lock for exclusive access
    ///
    /// The lock file is created with `create_new`, so two processes racing
    /// for it cannot both succeed.
    pub async fn acquire_lock(&self) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path();

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            // A lock file that does not parse yet is still being written
            let lock_info: LockInfo = serde_json::from_str(&content).map_err(|_| {
                CloudError::LockError("State lock is being taken by another process".to_string())
            })?;

            // Locks older than an hour are considered stale
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(locked_by(&lock_info));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
            match fs::remove_file(&lock_path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(
                    "State lock was taken by another process".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!("Acquired state lock");
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

fn locked_by(lock_info: &LockInfo) -> CloudError {
    CloudError::LockError(format!(
        "State is locked by {} since {}",
        lock_info.holder, lock_info.acquired_at
    ))
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for the state lock
#[derive(Debug)]
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            // Synchronous cleanup in drop - not ideal but necessary
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
