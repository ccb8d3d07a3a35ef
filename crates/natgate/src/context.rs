use natgate_cloud::{Reconciler, StateFile, StateLock, StateManager};
use natgate_config::Manifest;
use std::collections::BTreeSet;

/// Everything a command needs: the manifest, a configured reconciler and
/// the project's state directory
pub struct Context {
    pub manifest: Manifest,
    pub reconciler: Reconciler,
    pub state: StateManager,
}

impl Context {
    pub fn new(manifest: Manifest, reconciler: Reconciler, state: StateManager) -> Self {
        Self {
            manifest,
            reconciler,
            state,
        }
    }

    /// Gateways a command operates on: declared or tracked, or just `name`
    pub fn target_names(
        &self,
        name: Option<&str>,
        state: &StateFile,
    ) -> anyhow::Result<Vec<String>> {
        let mut names: BTreeSet<String> = self.manifest.gateways.keys().cloned().collect();
        names.extend(state.gateways.keys().cloned());

        match name {
            None => Ok(names.into_iter().collect()),
            Some(name) if names.contains(name) => Ok(vec![name.to_string()]),
            Some(name) => Err(anyhow::anyhow!(
                "Unknown gateway '{}'. Known gateways: {}",
                name,
                names.into_iter().collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

/// Release the state lock after a command ran
///
/// A failed release is only reported when the command itself succeeded.
pub async fn release_lock<T>(lock: StateLock, result: anyhow::Result<T>) -> anyhow::Result<T> {
    match lock.release().await {
        Ok(()) => result,
        Err(err) if result.is_ok() => Err(err.into()),
        Err(err) => {
            tracing::warn!("Failed to release state lock: {}", err);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn broken_lock(root: &std::path::Path) -> StateLock {
        let lock = StateManager::new(root).acquire_lock().await.unwrap();
        let lock_path = root.join(".natgate/lock.json");
        std::fs::remove_file(&lock_path).unwrap();
        std::fs::create_dir(&lock_path).unwrap();
        lock
    }

    #[tokio::test]
    async fn test_release_failure_keeps_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let lock = broken_lock(dir.path()).await;

        let result: anyhow::Result<()> =
            release_lock(lock, Err(anyhow::anyhow!("apply failed"))).await;

        assert_eq!(result.unwrap_err().to_string(), "apply failed");
    }

    #[tokio::test]
    async fn test_release_failure_reported_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let lock = broken_lock(dir.path()).await;

        let result = release_lock(lock, Ok(())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_release_removes_lock() {
        let dir = tempfile::tempdir().unwrap();
        let lock = StateManager::new(dir.path()).acquire_lock().await.unwrap();

        release_lock(lock, Ok(())).await.unwrap();
        assert!(!dir.path().join(".natgate/lock.json").exists());
    }
}
