//! Chromium backend over the DevTools protocol.
//!
//! Element references are realized by stamping matched DOM nodes with a
//! `data-jobpilot-id` attribute from injected JavaScript; every later
//! interaction addresses the node through that attribute. The stamp dies
//! with the document, which is exactly the lifetime the engine promises for
//! an element id.

use crate::driver::{ElementId, PageDriver};
use crate::errors::AutomationError;
use crate::selector::Selector;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

pub struct ChromiumDriver {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl ChromiumDriver {
    /// Launch a browser with a fixed 1920x1080 viewport and one page.
    #[instrument]
    pub async fn launch(headless: bool, timeout: Duration) -> Result<Self, AutomationError> {
        let mut builder = BrowserConfig::builder().window_size(1920, 1080);
        if !headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|e| AutomationError::DriverError(format!("browser config: {e}")))?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| AutomationError::DriverError(format!("browser launch: {e}")))?;

        // The event stream must be drained for the browser to function.
        let handler = tokio::spawn(async move { while events.next().await.is_some() {} });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AutomationError::DriverError(format!("new page: {e}")))?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler: Mutex::new(Some(handler)),
            timeout,
        })
    }

    async fn bounded<T, F, E>(&self, what: &str, fut: F) -> Result<T, AutomationError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AutomationError::DriverError(format!("{what}: {e}"))),
            Err(_) => Err(AutomationError::Timeout(format!(
                "{what} did not complete within {:?}",
                self.timeout
            ))),
        }
    }

    async fn eval<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        script: String,
    ) -> Result<T, AutomationError> {
        let result = self.bounded(what, self.page.evaluate(script)).await?;
        result
            .into_value()
            .map_err(|e| AutomationError::DriverError(format!("{what}: bad result: {e}")))
    }

    fn css_for(id: &ElementId) -> String {
        format!("[data-jobpilot-id=\"{}\"]", id.0)
    }
}

fn js_string(value: &str) -> String {
    // serde_json string encoding doubles as JS string literal escaping
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression yielding the array of raw matches for one strategy, given
/// a `root` binding in scope.
fn match_expr(selector: &Selector) -> Result<String, AutomationError> {
    let expr = match selector {
        Selector::Css(css) => format!("Array.from(root.querySelectorAll({}))", js_string(css)),
        Selector::Text(text) => format!(
            "(() => {{ const needle = {}; \
             const all = Array.from(root.querySelectorAll('*')) \
               .filter(el => (el.textContent || '').trim() === needle); \
             return all.filter(el => !all.some(other => other !== el && el.contains(other))); }})()",
            js_string(text)
        ),
        Selector::TextContains(text) => format!(
            "(() => {{ const needle = {}.toLowerCase(); \
             const all = Array.from(root.querySelectorAll('*')) \
               .filter(el => (el.textContent || '').toLowerCase().includes(needle)); \
             return all.filter(el => !all.some(other => other !== el && el.contains(other))); }})()",
            js_string(text)
        ),
        Selector::Role { role, name } => {
            let tag = match role.as_str() {
                "navigation" => "nav",
                "button" => "button",
                "link" => "a",
                "textbox" => "input",
                "row" => "tr",
                _ => "",
            };
            let css = if tag.is_empty() {
                format!("[role=\"{role}\"]")
            } else {
                format!("{tag}, [role=\"{role}\"]")
            };
            let filter = match name {
                Some(name) => format!(
                    ".filter(el => (el.getAttribute('aria-label') || el.textContent || '').trim() === {})",
                    js_string(name)
                ),
                None => String::new(),
            };
            format!(
                "Array.from(root.querySelectorAll({})){}",
                js_string(&css),
                filter
            )
        }
        Selector::TestId(value) => format!(
            "Array.from(root.querySelectorAll({}))",
            js_string(&format!("[data-testid*=\"{value}\"]"))
        ),
        Selector::AriaLabelContains(value) => attr_contains_expr("aria-label", value),
        Selector::TitleContains(value) => attr_contains_expr("title", value),
        Selector::PlaceholderContains(value) => attr_contains_expr("placeholder", value),
        Selector::Invalid(reason) => {
            return Err(AutomationError::InvalidSelector(reason.clone()))
        }
    };
    Ok(expr)
}

fn attr_contains_expr(attr: &str, value: &str) -> String {
    format!(
        "Array.from(root.querySelectorAll('[{attr}]')) \
         .filter(el => (el.getAttribute('{attr}') || '').toLowerCase().includes({}.toLowerCase()))",
        js_string(value)
    )
}

fn query_script(selector: &Selector, scope: Option<&ElementId>) -> Result<String, AutomationError> {
    let root = match scope {
        Some(id) => format!(
            "document.querySelector({})",
            js_string(&ChromiumDriver::css_for(id))
        ),
        None => "document".to_string(),
    };
    let matches = match_expr(selector)?;
    Ok(format!(
        "(() => {{ \
           const root = {root}; \
           if (!root) return []; \
           const matches = {matches}; \
           if (!window.__jobpilotSeq) window.__jobpilotSeq = 0; \
           return matches.map(el => {{ \
             if (!el.hasAttribute('data-jobpilot-id')) {{ \
               el.setAttribute('data-jobpilot-id', 'jp-' + (++window.__jobpilotSeq)); \
             }} \
             return el.getAttribute('data-jobpilot-id'); \
           }}); \
         }})()"
    ))
}

/// Script evaluating one expression against a stamped element, `el` in scope
fn element_script(id: &ElementId, body: &str) -> String {
    format!(
        "(() => {{ \
           const el = document.querySelector({}); \
           if (!el) return null; \
           return {body}; \
         }})()",
        js_string(&ChromiumDriver::css_for(id))
    )
}

#[async_trait::async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.bounded("goto", self.page.goto(url)).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        let url = self.bounded("current url", self.page.url()).await?;
        Ok(url.unwrap_or_default())
    }

    async fn query(
        &self,
        selector: &Selector,
        scope: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, AutomationError> {
        let script = query_script(selector, scope)?;
        let ids: Vec<String> = self.eval("query", script).await?;
        debug!(%selector, matches = ids.len(), "query");
        Ok(ids.into_iter().map(ElementId).collect())
    }

    async fn is_visible(&self, id: &ElementId) -> Result<bool, AutomationError> {
        let script = element_script(
            id,
            "(() => { const rect = el.getBoundingClientRect(); \
              const style = window.getComputedStyle(el); \
              return rect.width > 0 && rect.height > 0 && \
                style.visibility !== 'hidden' && style.display !== 'none'; })()",
        );
        let visible: Option<bool> = self.eval("is_visible", script).await?;
        Ok(visible.unwrap_or(false))
    }

    async fn is_enabled(&self, id: &ElementId) -> Result<bool, AutomationError> {
        let script = element_script(
            id,
            "!el.disabled && el.getAttribute('aria-disabled') !== 'true'",
        );
        let enabled: Option<bool> = self.eval("is_enabled", script).await?;
        Ok(enabled.unwrap_or(false))
    }

    async fn text(&self, id: &ElementId) -> Result<String, AutomationError> {
        let script = element_script(id, "(el.innerText || el.textContent || '')");
        let text: Option<String> = self.eval("text", script).await?;
        text.ok_or_else(|| AutomationError::ElementNotFound(format!("stale element {id}")))
    }

    async fn attribute(
        &self,
        id: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        let script = element_script(id, &format!("el.getAttribute({})", js_string(name)));
        self.eval("attribute", script).await
    }

    async fn click(&self, id: &ElementId) -> Result<(), AutomationError> {
        let element = self
            .bounded("find for click", self.page.find_element(Self::css_for(id)))
            .await?;
        self.bounded("click", element.click()).await?;
        Ok(())
    }

    async fn fill(&self, id: &ElementId, text: &str) -> Result<(), AutomationError> {
        let element = self
            .bounded("find for fill", self.page.find_element(Self::css_for(id)))
            .await?;
        self.bounded("focus", element.click()).await?;
        // Clear any prefilled value before typing
        let clear = element_script(id, "(() => { el.value = ''; return true; })()");
        let _: Option<bool> = self.eval("clear", clear).await?;
        self.bounded("type", element.type_str(text)).await?;
        Ok(())
    }

    async fn press_key(&self, id: &ElementId, key: &str) -> Result<(), AutomationError> {
        let element = self
            .bounded("find for key", self.page.find_element(Self::css_for(id)))
            .await?;
        self.bounded("focus", element.focus()).await?;

        // CDP wants the generated character, not the key name
        let text = match key {
            "Enter" => "\r".to_string(),
            k if k.chars().count() == 1 => k.to_string(),
            _ => String::new(),
        };
        for kind in [DispatchKeyEventType::KeyDown, DispatchKeyEventType::KeyUp] {
            let event = DispatchKeyEventParams::builder()
                .key(key.to_string())
                .text(text.clone())
                .r#type(kind)
                .build()
                .map_err(|e| AutomationError::DriverError(format!("key event: {e}")))?;
            self.bounded("dispatch key", self.page.execute(event)).await?;
        }
        Ok(())
    }

    async fn wait_for_settle(&self, timeout: Duration) -> Result<(), AutomationError> {
        // Best effort: an in-flight navigation is awaited, a quiet page just
        // runs out the grace window.
        let grace = timeout.min(Duration::from_secs(2));
        if tokio::time::timeout(grace, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            warn!("no navigation settled within {grace:?}, continuing");
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn wait_millis(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        self.bounded(
            "screenshot",
            self.page.screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            ),
        )
        .await
    }

    async fn close(&self) -> Result<(), AutomationError> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser
                .close()
                .await
                .map_err(|e| AutomationError::DriverError(format!("browser close: {e}")))?;
            let _ = browser.wait().await;
        }
        if let Some(handler) = self.handler.lock().await.take() {
            handler.abort();
        }
        Ok(())
    }
}
