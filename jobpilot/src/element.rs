use crate::driver::{ElementId, PageDriver};
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::fmt;
use std::sync::Arc;

/// A live handle to one element in the current view.
///
/// Wraps the driver-side opaque id together with the driver itself so
/// interactions read like Playwright: `handle.click().await?`.
#[derive(Clone)]
pub struct ElementHandle {
    driver: Arc<dyn PageDriver>,
    id: ElementId,
}

impl ElementHandle {
    pub(crate) fn new(driver: Arc<dyn PageDriver>, id: ElementId) -> Self {
        Self { driver, id }
    }

    pub fn id(&self) -> &ElementId {
        &self.id
    }

    pub async fn is_visible(&self) -> Result<bool, AutomationError> {
        self.driver.is_visible(&self.id).await
    }

    pub async fn is_enabled(&self) -> Result<bool, AutomationError> {
        self.driver.is_enabled(&self.id).await
    }

    pub async fn text(&self) -> Result<String, AutomationError> {
        self.driver.text(&self.id).await
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>, AutomationError> {
        self.driver.attribute(&self.id, name).await
    }

    pub async fn click(&self) -> Result<(), AutomationError> {
        self.driver.click(&self.id).await
    }

    pub async fn fill(&self, text: &str) -> Result<(), AutomationError> {
        self.driver.fill(&self.id, text).await
    }

    pub async fn press_key(&self, key: &str) -> Result<(), AutomationError> {
        self.driver.press_key(&self.id, key).await
    }

    /// Find all matches for `selector` inside this element's subtree
    pub async fn query(&self, selector: &Selector) -> Result<Vec<ElementHandle>, AutomationError> {
        let ids = self.driver.query(selector, Some(&self.id)).await?;
        Ok(ids
            .into_iter()
            .map(|id| ElementHandle::new(self.driver.clone(), id))
            .collect())
    }
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementHandle").field("id", &self.id).finish()
    }
}
