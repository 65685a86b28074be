use crate::errors::AutomationError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Already-resolved inputs for one run.
///
/// Precedence between sources (file, environment, flags) is settled before
/// this struct exists; the engine has no opinion on it. `load` implements the
/// conventional resolution the CLI uses: JSON file, then `JOBPILOT_*`
/// environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base address of the job console
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Single uniform timeout applied to every bounded wait
    pub timeout_ms: u64,
    pub headless: bool,
    /// Optional pre-declared job names; advisory only, never trusted over discovery
    pub known_jobs: Vec<String>,
    /// Where diagnostic captures land
    pub artifacts_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://platform.uipath.com".to_string(),
            username: None,
            password: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            headless: false,
            known_jobs: Vec::new(),
            artifacts_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides.
    /// A missing or unreadable file falls back to defaults with a warning,
    /// matching operator expectations for a tool that can also be driven
    /// entirely from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AutomationError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    AutomationError::InvalidConfig(format!(
                        "could not read {}: {e}",
                        path.display()
                    ))
                })?;
                serde_json::from_str(&raw).map_err(|e| {
                    AutomationError::InvalidConfig(format!(
                        "could not parse {}: {e}",
                        path.display()
                    ))
                })?
            }
            Some(path) => {
                warn!("config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("JOBPILOT_URL") {
            self.base_url = url;
        }
        if let Ok(username) = std::env::var("JOBPILOT_USERNAME") {
            if !username.is_empty() {
                self.username = Some(username);
            }
        }
        if let Ok(password) = std::env::var("JOBPILOT_PASSWORD") {
            if !password.is_empty() {
                self.password = Some(password);
            }
        }
        if let Ok(headless) = std::env::var("JOBPILOT_HEADLESS") {
            self.headless = headless.eq_ignore_ascii_case("true");
        }
        if let Ok(timeout) = std::env::var("JOBPILOT_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(ms) => self.timeout_ms = ms,
                Err(_) => warn!("ignoring unparsable JOBPILOT_TIMEOUT_MS={timeout}"),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Conventional listing address derived from the base, used as the
    /// direct-navigation fallback
    pub fn listing_url(&self) -> String {
        format!("{}/jobs", self.base_url.trim_end_matches('/'))
    }
}
