use crate::driver::PageDriver;
use crate::errors::AutomationError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Accepts a capture request for the current view and persists it somewhere
/// useful for offline failure analysis. The engine only dictates the two
/// trigger conditions (empty discovery, failed trigger), never the storage.
#[async_trait::async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Capture the current view, tagged with `reason`. Returns an artifact
    /// identifier on success.
    async fn capture(
        &self,
        driver: &Arc<dyn PageDriver>,
        reason: &str,
    ) -> Result<String, AutomationError>;
}

/// Writes PNG snapshots named after the reason tag into a directory.
pub struct FsDiagnosticSink {
    dir: PathBuf,
}

impl FsDiagnosticSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait::async_trait]
impl DiagnosticSink for FsDiagnosticSink {
    async fn capture(
        &self,
        driver: &Arc<dyn PageDriver>,
        reason: &str,
    ) -> Result<String, AutomationError> {
        let png = driver.screenshot().await?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AutomationError::Internal(format!("artifacts dir: {e}")))?;
        let path = self.dir.join(format!("{reason}.png"));
        std::fs::write(&path, png)
            .map_err(|e| AutomationError::Internal(format!("writing {}: {e}", path.display())))?;
        info!("saved diagnostic capture: {}", path.display());
        Ok(path.display().to_string())
    }
}

/// Capture is advisory: a failed capture is logged, never escalated.
pub(crate) async fn capture_best_effort(
    sink: &Arc<dyn DiagnosticSink>,
    driver: &Arc<dyn PageDriver>,
    reason: &str,
) -> Option<String> {
    match sink.capture(driver, reason).await {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            warn!("diagnostic capture '{reason}' failed: {e}");
            None
        }
    }
}
