use crate::driver::PageDriver;
use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::selector::Selector;
use std::sync::Arc;
use tracing::{debug, instrument};

/// An ordered cascade of locator strategies for one logical target.
///
/// Strategies are declared from most semantic (role, test id, label) to most
/// brittle (visible text, class heuristics), so upstream DOM drift degrades
/// the cascade gracefully instead of breaking it outright. Immutable once built.
#[derive(Debug, Clone)]
pub struct LocatorSpec {
    target: &'static str,
    strategies: Vec<Selector>,
}

impl LocatorSpec {
    pub fn new(target: &'static str, strategies: Vec<Selector>) -> Self {
        Self { target, strategies }
    }

    /// Convenience constructor from prefixed selector strings
    pub fn parse(target: &'static str, strategies: &[&str]) -> Self {
        Self::new(target, strategies.iter().map(|s| Selector::from(*s)).collect())
    }

    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn strategies(&self) -> &[Selector] {
        &self.strategies
    }
}

/// Resolves logical targets to concrete element handles.
///
/// A strategy succeeds only when it yields exactly one element that is both
/// visible and enabled. Ties are treated as failure for that strategy and the
/// cascade continues rather than guessing.
#[derive(Clone)]
pub struct Locator {
    driver: Arc<dyn PageDriver>,
}

impl Locator {
    pub(crate) fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self { driver }
    }

    /// Try each strategy in `spec` in declared order, against `scope` when
    /// given (the whole view otherwise). Returns `ElementNotFound` once the
    /// cascade is exhausted; a timed-out resolution is a definitive miss,
    /// never retried here.
    #[instrument(level = "debug", skip(self, spec, scope), fields(target = spec.target()))]
    pub async fn resolve(
        &self,
        spec: &LocatorSpec,
        scope: Option<&ElementHandle>,
    ) -> Result<ElementHandle, AutomationError> {
        for selector in spec.strategies() {
            if let Selector::Invalid(reason) = selector {
                return Err(AutomationError::InvalidSelector(reason.clone()));
            }

            let candidates = self.interactable_matches(selector, scope).await?;
            match candidates.len() {
                1 => {
                    debug!(%selector, "strategy resolved target '{}'", spec.target());
                    return Ok(candidates.into_iter().next().ok_or_else(|| {
                        AutomationError::Internal("candidate vanished after match".into())
                    })?);
                }
                0 => debug!(%selector, "strategy matched nothing, trying next"),
                n => debug!(%selector, matches = n, "strategy is ambiguous, trying next"),
            }
        }

        Err(AutomationError::ElementNotFound(format!(
            "no strategy resolved target '{}' ({} tried)",
            spec.target(),
            spec.strategies().len()
        )))
    }

    /// First strategy that yields one or more interactable matches wins and
    /// its full match list is returned; strategies are never merged. Used by
    /// discovery, where multiple containers are the expected shape.
    #[instrument(level = "debug", skip(self, spec, scope), fields(target = spec.target()))]
    pub async fn resolve_all(
        &self,
        spec: &LocatorSpec,
        scope: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        for selector in spec.strategies() {
            if let Selector::Invalid(reason) = selector {
                return Err(AutomationError::InvalidSelector(reason.clone()));
            }

            let candidates = self.interactable_matches(selector, scope).await?;
            if !candidates.is_empty() {
                debug!(
                    %selector,
                    matches = candidates.len(),
                    "strategy resolved containers for '{}'",
                    spec.target()
                );
                return Ok(candidates);
            }
        }

        Ok(Vec::new())
    }

    /// Whether any strategy in `spec` has at least one visible match. Used by
    /// indicator checks where presence matters, not uniqueness.
    pub async fn any_visible(&self, spec: &LocatorSpec) -> Result<bool, AutomationError> {
        for selector in spec.strategies() {
            let ids = self.driver.query(selector, None).await?;
            for id in &ids {
                if self.driver.is_visible(id).await? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn interactable_matches(
        &self,
        selector: &Selector,
        scope: Option<&ElementHandle>,
    ) -> Result<Vec<ElementHandle>, AutomationError> {
        let ids = self
            .driver
            .query(selector, scope.map(|handle| handle.id()))
            .await?;

        let mut matches = Vec::new();
        for id in ids {
            if self.driver.is_visible(&id).await? && self.driver.is_enabled(&id).await? {
                matches.push(ElementHandle::new(self.driver.clone(), id));
            }
        }
        Ok(matches)
    }
}
