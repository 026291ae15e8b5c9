//! Runtime environment prerequisites.
//!
//! An update run does not download anything until its prerequisite is
//! satisfied. The default prerequisite is a Wine prefix.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, info};

use crate::manager::{BoxFuture, ManagerError, ManagerResult};

/// An environment precondition that can set itself up.
pub trait Prerequisite: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether the environment already exists.
    fn is_satisfied(&self) -> BoxFuture<'_, bool>;

    /// Create the environment.
    fn provision(&self) -> BoxFuture<'_, ManagerResult<()>>;
}

/// Registry file present in every initialised prefix.
const PREFIX_MARKER: &str = "system.reg";

/// A Wine prefix directory.
#[derive(Debug, Clone)]
pub struct WinePrefix {
    dir: PathBuf,
    wineboot: PathBuf,
}

impl WinePrefix {
    /// A prefix at `dir`, initialised with `wineboot` from `PATH`.
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            wineboot: PathBuf::from("wineboot"),
        }
    }

    /// Use a specific `wineboot` binary.
    pub fn with_wineboot(mut self, wineboot: PathBuf) -> Self {
        self.wineboot = wineboot;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn failed(&self, reason: impl Into<String>) -> ManagerError {
        ManagerError::PrerequisiteFailed {
            name: self.name().to_string(),
            reason: reason.into(),
        }
    }
}

impl Prerequisite for WinePrefix {
    fn name(&self) -> &str {
        "wine prefix"
    }

    fn is_satisfied(&self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            let exists = tokio::fs::metadata(self.dir.join(PREFIX_MARKER)).await.is_ok();
            debug!(prefix = %self.dir.display(), exists, "checked wine prefix");
            exists
        })
    }

    fn provision(&self) -> BoxFuture<'_, ManagerResult<()>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| ManagerError::CreateDirFailed {
                    path: self.dir.clone(),
                    source: e,
                })?;

            info!(prefix = %self.dir.display(), "creating wine prefix");

            let output = Command::new(&self.wineboot)
                .arg("--init")
                .env("WINEPREFIX", &self.dir)
                .output()
                .await
                .map_err(|e| {
                    self.failed(format!("failed to run {}: {}", self.wineboot.display(), e))
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(self.failed(format!(
                    "{} exited with {}: {}",
                    self.wineboot.display(),
                    output.status,
                    stderr.trim()
                )));
            }

            info!(prefix = %self.dir.display(), "wine prefix created");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_prefix_satisfied_by_registry_file() {
        let temp = TempDir::new().unwrap();
        let prefix = WinePrefix::new(temp.path().join("pfx"));
        assert!(!prefix.is_satisfied().await);

        std::fs::create_dir_all(prefix.dir()).unwrap();
        std::fs::write(prefix.dir().join(PREFIX_MARKER), "WINE REGISTRY").unwrap();
        assert!(prefix.is_satisfied().await);
    }

    #[tokio::test]
    async fn test_provision_runs_wineboot() {
        let temp = TempDir::new().unwrap();
        let prefix = WinePrefix::new(temp.path().join("pfx")).with_wineboot(PathBuf::from("true"));

        prefix.provision().await.unwrap();
        assert!(prefix.dir().is_dir());
    }

    #[tokio::test]
    async fn test_provision_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let prefix =
            WinePrefix::new(temp.path().join("pfx")).with_wineboot(PathBuf::from("false"));

        match prefix.provision().await {
            Err(ManagerError::PrerequisiteFailed { name, .. }) => assert_eq!(name, "wine prefix"),
            other => panic!("Expected PrerequisiteFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_wineboot_is_reported() {
        let temp = TempDir::new().unwrap();
        let prefix = WinePrefix::new(temp.path().join("pfx"))
            .with_wineboot(PathBuf::from("/nonexistent/wineboot"));

        assert!(matches!(
            prefix.provision().await,
            Err(ManagerError::PrerequisiteFailed { .. })
        ));
    }
}
