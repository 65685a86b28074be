//! Resilient browser automation for a job management console
//!
//! This crate drives a third-party web console on behalf of an operator with
//! no API access, inspired by Playwright's web automation model: logical
//! targets resolve through ordered locator cascades, authentication state is
//! classified fresh on every check, and per-job failures become outcome
//! values instead of faults so one bad job name never aborts a run.

use std::sync::Arc;
use tracing::{info, instrument, warn};

pub mod auth;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod driver;
pub mod element;
pub mod errors;
pub mod locator;
pub mod nav;
pub mod orchestrator;
pub mod selector;
#[cfg(test)]
mod tests;
pub mod trigger;

pub use auth::{AuthOutcome, AuthState};
pub use config::Config;
pub use diagnostics::{DiagnosticSink, FsDiagnosticSink};
pub use discovery::DiscoveredJob;
pub use driver::{ChromiumDriver, ElementId, PageDriver};
pub use element::ElementHandle;
pub use errors::AutomationError;
pub use locator::{Locator, LocatorSpec};
pub use orchestrator::{
    ActionOutcome, ContinuationGate, Orchestrator, RunResult, TriggerStatus, Unattended,
};
pub use selector::Selector;

/// One interaction context with the target console.
///
/// Owns the browser driver and the resolved configuration for exactly one
/// run. The orchestrator tears it down unconditionally on every exit path;
/// nothing else may outlive it.
pub struct Session {
    driver: Arc<dyn PageDriver>,
    diagnostics: Arc<dyn DiagnosticSink>,
    config: Config,
}

impl Session {
    /// Launch a Chromium-backed session from resolved configuration.
    #[instrument(skip(config), fields(base_url = %config.base_url, headless = config.headless))]
    pub async fn launch(config: Config) -> Result<Self, AutomationError> {
        let driver = ChromiumDriver::launch(config.headless, config.timeout()).await?;
        let diagnostics = FsDiagnosticSink::new(config.artifacts_dir.clone());
        Ok(Self::with_driver(config, Arc::new(driver), Arc::new(diagnostics)))
    }

    /// Build a session over an arbitrary driver and sink. This is the seam
    /// the test suite uses to run the engine against a scripted view.
    pub fn with_driver(
        config: Config,
        driver: Arc<dyn PageDriver>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            driver,
            diagnostics,
            config,
        }
    }

    pub fn driver(&self) -> &Arc<dyn PageDriver> {
        &self.driver
    }

    pub fn diagnostics(&self) -> &Arc<dyn DiagnosticSink> {
        &self.diagnostics
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn locator(&self) -> Locator {
        Locator::new(self.driver.clone())
    }

    /// Navigate to the console's base address and let the view settle.
    #[instrument(skip(self))]
    pub async fn open(&self) -> Result<(), AutomationError> {
        info!("navigating to {}", self.config.base_url);
        self.driver.goto(&self.config.base_url).await?;
        self.driver.wait_for_settle(self.config.timeout()).await
    }

    /// Tear down the underlying browser. Failures are logged, not raised:
    /// teardown must never mask the run's real outcome.
    pub async fn close(&self) {
        if let Err(e) = self.driver.close().await {
            warn!("session teardown reported an error: {e}");
        } else {
            info!("session closed");
        }
    }
}
