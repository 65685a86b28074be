pub mod chromium;

use crate::errors::AutomationError;
use crate::selector::Selector;
use std::time::Duration;

pub use chromium::ChromiumDriver;

/// Opaque reference to an element inside the driver's current view.
///
/// Only valid until the next navigation; a stale id surfaces as
/// `AutomationError::ElementNotFound` from the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementId(pub String);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The common trait every browser backend must implement.
///
/// This is the entire surface the engine depends on: selector resolution,
/// interactability probes, fill/click/key dispatch, navigation and settling.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the current view to an absolute address
    async fn goto(&self, url: &str) -> Result<(), AutomationError>;

    /// Address of the current view
    async fn current_url(&self) -> Result<String, AutomationError>;

    /// Find all elements matching a selector, optionally scoped to a subtree
    async fn query(
        &self,
        selector: &Selector,
        scope: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, AutomationError>;

    async fn is_visible(&self, id: &ElementId) -> Result<bool, AutomationError>;

    async fn is_enabled(&self, id: &ElementId) -> Result<bool, AutomationError>;

    /// Visible text content of the element
    async fn text(&self, id: &ElementId) -> Result<String, AutomationError>;

    async fn attribute(
        &self,
        id: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AutomationError>;

    async fn click(&self, id: &ElementId) -> Result<(), AutomationError>;

    /// Clear the element and type the given text into it
    async fn fill(&self, id: &ElementId, text: &str) -> Result<(), AutomationError>;

    /// Dispatch a key press (e.g. "Enter") to the element
    async fn press_key(&self, id: &ElementId, key: &str) -> Result<(), AutomationError>;

    /// Wait for in-flight navigation/network activity to settle, bounded by `timeout`
    async fn wait_for_settle(&self, timeout: Duration) -> Result<(), AutomationError>;

    /// Plain bounded pause, for views that render after load
    async fn wait_millis(&self, ms: u64);

    /// PNG snapshot of the current view
    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError>;

    /// Tear down the underlying browser. Must be safe to call exactly once.
    async fn close(&self) -> Result<(), AutomationError>;
}
