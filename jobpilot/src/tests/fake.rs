//! Scripted in-memory driver for exercising the engine without a browser.
//!
//! Views are flat element lists keyed by URL; clicking or key-pressing an
//! element can transition the current view, which is how login flows and
//! navigation are scripted. A small CSS-subset matcher (tag, `.class`,
//! `[attr="v"]`, `[attr*="v"]`, `:first-child`, descendant, comma) covers
//! every selector the production cascades use.

use crate::diagnostics::DiagnosticSink;
use crate::driver::{ElementId, PageDriver};
use crate::errors::AutomationError;
use crate::selector::Selector;
use crate::{Config, Session};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub text: String,
    pub attrs: HashMap<String, String>,
    pub parent: Option<usize>,
    pub visible: bool,
    pub enabled: bool,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: String::new(),
            attrs: HashMap::new(),
            parent: None,
            visible: true,
            enabled: true,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn child_of(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Default)]
pub struct FakeDriver {
    views: Mutex<HashMap<String, Vec<FakeElement>>>,
    current: Mutex<String>,
    /// (view url, element index) -> view url shown after clicking it
    click_transitions: Mutex<HashMap<(String, usize), String>>,
    /// (view url, element index, key) -> view url shown after the key press
    key_transitions: Mutex<HashMap<(String, usize, String), String>>,
    /// When set, `current_url` fails as if the browser connection died
    url_reads_fail: Mutex<bool>,
    pub log: Mutex<Vec<String>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_view(self, url: &str, elements: Vec<FakeElement>) -> Self {
        self.views
            .lock()
            .expect("views lock")
            .insert(url.to_string(), elements);
        self
    }

    pub fn on_click(self, url: &str, index: usize, target: &str) -> Self {
        self.click_transitions
            .lock()
            .expect("transitions lock")
            .insert((url.to_string(), index), target.to_string());
        self
    }

    pub fn on_key(self, url: &str, index: usize, key: &str, target: &str) -> Self {
        self.key_transitions
            .lock()
            .expect("transitions lock")
            .insert((url.to_string(), index, key.to_string()), target.to_string());
        self
    }

    pub fn fail_url_reads(self) -> Self {
        *self.url_reads_fail.lock().expect("url flag lock") = true;
        self
    }

    pub fn log_entries(&self) -> Vec<String> {
        self.log.lock().expect("log lock").clone()
    }

    pub fn logged(&self, prefix: &str) -> usize {
        self.log_entries()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn push_log(&self, entry: String) {
        self.log.lock().expect("log lock").push(entry);
    }

    fn current_view(&self) -> (String, Vec<FakeElement>) {
        let url = self.current.lock().expect("current lock").clone();
        let elements = self
            .views
            .lock()
            .expect("views lock")
            .get(&url)
            .cloned()
            .unwrap_or_default();
        (url, elements)
    }

    fn parse_id(id: &ElementId) -> Result<(String, usize), AutomationError> {
        let (url, idx) = id
            .0
            .rsplit_once('#')
            .ok_or_else(|| AutomationError::Internal(format!("malformed fake id {id}")))?;
        let idx = idx
            .parse()
            .map_err(|_| AutomationError::Internal(format!("malformed fake id {id}")))?;
        Ok((url.to_string(), idx))
    }

    fn element(&self, id: &ElementId) -> Result<(String, usize, FakeElement), AutomationError> {
        let (url, idx) = Self::parse_id(id)?;
        let current = self.current.lock().expect("current lock").clone();
        if url != current {
            return Err(AutomationError::ElementNotFound(format!(
                "element {id} belongs to a previous view"
            )));
        }
        let views = self.views.lock().expect("views lock");
        let element = views
            .get(&url)
            .and_then(|elements| elements.get(idx))
            .cloned()
            .ok_or_else(|| AutomationError::ElementNotFound(format!("no element {id}")))?;
        Ok((url, idx, element))
    }

    fn inner_text(elements: &[FakeElement], idx: usize) -> String {
        let mut fragments = Vec::new();
        if !elements[idx].text.is_empty() {
            fragments.push(elements[idx].text.clone());
        }
        for (i, element) in elements.iter().enumerate() {
            if is_descendant(elements, i, idx) && !element.text.is_empty() {
                fragments.push(element.text.clone());
            }
        }
        fragments.join("\n")
    }

    fn matches(elements: &[FakeElement], idx: usize, selector: &Selector) -> bool {
        let element = &elements[idx];
        match selector {
            Selector::Css(css) => css_matches(elements, idx, css),
            Selector::Text(needle) => element.text.trim() == needle.as_str(),
            Selector::TextContains(needle) => element
                .text
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Selector::Role { role, name } => {
                let tag_for_role = match role.as_str() {
                    "navigation" => "nav",
                    "button" => "button",
                    "link" => "a",
                    "textbox" => "input",
                    "row" => "tr",
                    _ => "",
                };
                let role_matches = element.attrs.get("role").is_some_and(|r| r == role)
                    || (!tag_for_role.is_empty() && element.tag == tag_for_role);
                let name_matches = match name {
                    Some(name) => {
                        element.attrs.get("aria-label").is_some_and(|l| l == name)
                            || Self::inner_text(elements, idx).trim() == name.as_str()
                    }
                    None => true,
                };
                role_matches && name_matches
            }
            Selector::TestId(value) => element
                .attrs
                .get("data-testid")
                .is_some_and(|v| v.contains(value.as_str())),
            Selector::AriaLabelContains(value) => attr_contains(element, "aria-label", value),
            Selector::TitleContains(value) => attr_contains(element, "title", value),
            Selector::PlaceholderContains(value) => attr_contains(element, "placeholder", value),
            Selector::Invalid(_) => false,
        }
    }
}

fn attr_contains(element: &FakeElement, attr: &str, value: &str) -> bool {
    element
        .attrs
        .get(attr)
        .is_some_and(|v| v.to_lowercase().contains(&value.to_lowercase()))
}

fn is_descendant(elements: &[FakeElement], idx: usize, ancestor: usize) -> bool {
    let mut current = elements[idx].parent;
    while let Some(parent) = current {
        if parent == ancestor {
            return true;
        }
        current = elements[parent].parent;
    }
    false
}

// ---- CSS subset matcher ----

#[derive(Debug, Default)]
struct Compound {
    tag: String,
    classes: Vec<String>,
    attrs: Vec<(String, AttrOp, String)>,
    first_child: bool,
}

#[derive(Debug)]
enum AttrOp {
    Equals,
    Contains,
    Present,
}

fn parse_compound(part: &str) -> Option<Compound> {
    let mut compound = Compound::default();
    let mut rest = part;
    if let Some(stripped) = rest.strip_suffix(":first-child") {
        compound.first_child = true;
        rest = stripped;
    }

    let head_end = rest.find('[').unwrap_or(rest.len());
    let head = &rest[..head_end];
    let mut attr_part = &rest[head_end..];
    while let Some(start) = attr_part.find('[') {
        let end = attr_part.find(']')?;
        let clause = &attr_part[start + 1..end];
        let (name, op, value) = if let Some((name, value)) = clause.split_once("*=") {
            (name, AttrOp::Contains, value)
        } else if let Some((name, value)) = clause.split_once('=') {
            (name, AttrOp::Equals, value)
        } else {
            (clause, AttrOp::Present, "")
        };
        let value = value.trim().trim_matches(['"', '\'']);
        compound
            .attrs
            .push((name.trim().to_string(), op, value.to_string()));
        attr_part = &attr_part[end + 1..];
    }

    for (i, segment) in head.split('.').enumerate() {
        if i == 0 {
            compound.tag = segment.to_string();
        } else if !segment.is_empty() {
            compound.classes.push(segment.to_string());
        }
    }

    Some(compound)
}

fn compound_matches(elements: &[FakeElement], idx: usize, part: &str) -> bool {
    let Some(compound) = parse_compound(part) else {
        return false;
    };
    let element = &elements[idx];

    if !compound.tag.is_empty() && compound.tag != "*" && compound.tag != element.tag {
        return false;
    }

    let class_attr = element.attrs.get("class").cloned().unwrap_or_default();
    let class_list: Vec<&str> = class_attr.split_whitespace().collect();
    if !compound
        .classes
        .iter()
        .all(|class| class_list.contains(&class.as_str()))
    {
        return false;
    }

    for (name, op, value) in &compound.attrs {
        let actual = element.attrs.get(name);
        let ok = match op {
            AttrOp::Equals => actual.is_some_and(|v| v == value),
            AttrOp::Contains => actual.is_some_and(|v| v.contains(value.as_str())),
            AttrOp::Present => actual.is_some(),
        };
        if !ok {
            return false;
        }
    }

    if compound.first_child {
        let first_sibling = elements
            .iter()
            .position(|other| other.parent == element.parent);
        if first_sibling != Some(idx) {
            return false;
        }
    }

    true
}

fn css_matches(elements: &[FakeElement], idx: usize, css: &str) -> bool {
    css.split(',')
        .map(str::trim)
        .any(|selector| path_matches(elements, idx, selector))
}

fn path_matches(elements: &[FakeElement], idx: usize, selector: &str) -> bool {
    let parts: Vec<&str> = selector.split_whitespace().collect();
    let Some((last, ancestors)) = parts.split_last() else {
        return false;
    };
    if !compound_matches(elements, idx, last) {
        return false;
    }

    // Each ancestor part must match somewhere strictly above, in order.
    let mut current = elements[idx].parent;
    for part in ancestors.iter().rev() {
        loop {
            match current {
                None => return false,
                Some(parent) => {
                    let matched = compound_matches(elements, parent, part);
                    current = elements[parent].parent;
                    if matched {
                        break;
                    }
                }
            }
        }
    }
    true
}

#[async_trait::async_trait]
impl PageDriver for FakeDriver {
    async fn goto(&self, url: &str) -> Result<(), AutomationError> {
        self.push_log(format!("goto:{url}"));
        *self.current.lock().expect("current lock") = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, AutomationError> {
        if *self.url_reads_fail.lock().expect("url flag lock") {
            return Err(AutomationError::DriverError(
                "browser connection lost".to_string(),
            ));
        }
        Ok(self.current.lock().expect("current lock").clone())
    }

    async fn query(
        &self,
        selector: &Selector,
        scope: Option<&ElementId>,
    ) -> Result<Vec<ElementId>, AutomationError> {
        let (url, elements) = self.current_view();
        let scope_idx = match scope {
            Some(id) => Some(self.element(id)?.1),
            None => None,
        };
        let mut ids = Vec::new();
        for idx in 0..elements.len() {
            if let Some(scope_idx) = scope_idx {
                if !is_descendant(&elements, idx, scope_idx) {
                    continue;
                }
            }
            if Self::matches(&elements, idx, selector) {
                ids.push(ElementId(format!("{url}#{idx}")));
            }
        }
        Ok(ids)
    }

    async fn is_visible(&self, id: &ElementId) -> Result<bool, AutomationError> {
        Ok(self.element(id)?.2.visible)
    }

    async fn is_enabled(&self, id: &ElementId) -> Result<bool, AutomationError> {
        Ok(self.element(id)?.2.enabled)
    }

    async fn text(&self, id: &ElementId) -> Result<String, AutomationError> {
        let (_, idx, _) = self.element(id)?;
        let (_, elements) = self.current_view();
        Ok(Self::inner_text(&elements, idx))
    }

    async fn attribute(
        &self,
        id: &ElementId,
        name: &str,
    ) -> Result<Option<String>, AutomationError> {
        Ok(self.element(id)?.2.attrs.get(name).cloned())
    }

    async fn click(&self, id: &ElementId) -> Result<(), AutomationError> {
        let (url, idx, _) = self.element(id)?;
        self.push_log(format!("click:{id}"));
        let target = self
            .click_transitions
            .lock()
            .expect("transitions lock")
            .get(&(url, idx))
            .cloned();
        if let Some(target) = target {
            *self.current.lock().expect("current lock") = target;
        }
        Ok(())
    }

    async fn fill(&self, id: &ElementId, text: &str) -> Result<(), AutomationError> {
        let (url, idx, _) = self.element(id)?;
        self.push_log(format!("fill:{id}:{text}"));
        let mut views = self.views.lock().expect("views lock");
        if let Some(element) = views.get_mut(&url).and_then(|elements| elements.get_mut(idx)) {
            element.attrs.insert("value".to_string(), text.to_string());
        }
        Ok(())
    }

    async fn press_key(&self, id: &ElementId, key: &str) -> Result<(), AutomationError> {
        let (url, idx, _) = self.element(id)?;
        self.push_log(format!("press:{id}:{key}"));
        let target = self
            .key_transitions
            .lock()
            .expect("transitions lock")
            .get(&(url, idx, key.to_string()))
            .cloned();
        if let Some(target) = target {
            *self.current.lock().expect("current lock") = target;
        }
        Ok(())
    }

    async fn wait_for_settle(&self, _timeout: Duration) -> Result<(), AutomationError> {
        self.push_log("settle".to_string());
        Ok(())
    }

    async fn wait_millis(&self, _ms: u64) {
        // Scripted views render instantly.
    }

    async fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
        Ok(b"png".to_vec())
    }

    async fn close(&self) -> Result<(), AutomationError> {
        self.push_log("close".to_string());
        Ok(())
    }
}

/// Sink recording capture reasons instead of persisting anything.
#[derive(Default)]
pub struct RecordingSink {
    pub reasons: Mutex<Vec<String>>,
}

#[async_trait::async_trait]
impl DiagnosticSink for RecordingSink {
    async fn capture(
        &self,
        _driver: &Arc<dyn PageDriver>,
        reason: &str,
    ) -> Result<String, AutomationError> {
        let mut reasons = self.reasons.lock().expect("reasons lock");
        reasons.push(reason.to_string());
        Ok(format!("capture-{}", reasons.len()))
    }
}

pub fn test_config() -> Config {
    Config {
        base_url: "https://console.test".to_string(),
        ..Config::default()
    }
}

pub fn session_with(
    driver: Arc<FakeDriver>,
    sink: Arc<RecordingSink>,
    config: Config,
) -> Session {
    Session::with_driver(config, driver, sink)
}

/// Listing view fixture used across discovery/trigger/orchestrator tests:
/// a table with "Daily Sales Report" and "Extract Data" rows, each with a
/// labeled play button.
pub fn jobs_view() -> Vec<FakeElement> {
    vec![
        FakeElement::new("table"),                                   // 0
        FakeElement::new("tbody").child_of(0),                       // 1
        FakeElement::new("tr").child_of(1),                          // 2
        FakeElement::new("td").text("Daily Sales Report").child_of(2), // 3
        FakeElement::new("button")
            .attr("aria-label", "Play")
            .child_of(2),                                            // 4
        FakeElement::new("tr").child_of(1),                          // 5
        FakeElement::new("td").text("Extract Data").child_of(5),     // 6
        FakeElement::new("button")
            .attr("aria-label", "Play")
            .child_of(5),                                            // 7
    ]
}
