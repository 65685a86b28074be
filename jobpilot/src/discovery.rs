//! Enumeration of named jobs on the listing view.

use crate::diagnostics::capture_best_effort;
use crate::element::ElementHandle;
use crate::errors::AutomationError;
use crate::locator::LocatorSpec;
use crate::selector::Selector;
use crate::Session;
use tracing::{debug, info, instrument, warn};

/// Discovery never scans past this many containers; a listing longer than
/// this is paginated upstream anyway.
const MAX_CONTAINERS: usize = 50;

/// One named job found on the listing view.
///
/// The handle is only valid within the lifetime of the current view; any
/// navigation invalidates it. Ordinal position disambiguates duplicate or
/// empty names.
#[derive(Debug, Clone)]
pub struct DiscoveredJob {
    pub name: String,
    pub ordinal: usize,
    pub handle: ElementHandle,
}

/// The container-strategy cascade, ordered from the test-id convention down
/// to class-name heuristics. The first strategy yielding one or more
/// containers wins; strategies are never merged, so mismatched heuristics
/// cannot produce conflicting job sets. Shared with the action trigger.
pub(crate) fn container_cascade() -> LocatorSpec {
    LocatorSpec::parse(
        "job container",
        &[
            "css:tr[data-testid*=\"job\"]",
            "css:tr[data-testid*=\"process\"]",
            "css:div[data-testid*=\"job\"]",
            "css:div[data-testid*=\"process\"]",
            "css:.job-row",
            "css:.process-row",
            "css:tbody tr",
            "css:[class*=\"job\"]",
            "css:[class*=\"process\"]",
        ],
    )
}

/// Nested name-extraction cascade: an explicit name cell or attribute first,
/// then the first non-empty visible text fragment. A row whose name cannot
/// be extracted is kept with an empty name rather than dropped, preserving
/// positional addressability.
pub(crate) async fn extract_name(container: &ElementHandle) -> Result<String, AutomationError> {
    let name_selectors = [
        Selector::from("css:td:first-child"),
        Selector::from("css:[class*=\"name\"]"),
        Selector::from("css:[class*=\"title\"]"),
    ];

    for selector in &name_selectors {
        if let Some(cell) = container.query(selector).await?.into_iter().next() {
            let text = cell.text().await?;
            let text = text.trim();
            if !text.is_empty() {
                return Ok(first_line(text));
            }
        }
    }

    let text = container.text().await?;
    let text = text.trim();
    if text.is_empty() {
        debug!("container yields no text, keeping empty name");
        Ok(String::new())
    } else {
        Ok(first_line(text))
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Enumerate visible jobs on the current listing view.
///
/// Zero containers across the whole cascade is not a failure: it returns an
/// empty sequence and requests an advisory diagnostic capture so the page
/// structure can be debugged offline.
#[instrument(skip(session))]
pub async fn discover(session: &Session) -> Result<Vec<DiscoveredJob>, AutomationError> {
    // Listings commonly render after load; give the view a moment.
    session.driver().wait_millis(2000).await;

    let containers = session
        .locator()
        .resolve_all(&container_cascade(), None)
        .await?;

    if containers.is_empty() {
        warn!("no job containers resolved by any strategy");
        capture_best_effort(session.diagnostics(), session.driver(), "jobs_page_debug").await;
        return Ok(Vec::new());
    }

    let mut jobs = Vec::new();
    for (ordinal, handle) in containers.into_iter().take(MAX_CONTAINERS).enumerate() {
        let name = extract_name(&handle).await?;
        jobs.push(DiscoveredJob {
            name,
            ordinal,
            handle,
        });
    }

    info!("discovered {} jobs", jobs.len());
    Ok(jobs)
}
