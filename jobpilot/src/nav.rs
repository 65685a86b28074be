//! Moving the session to the job-listing view.

use crate::errors::AutomationError;
use crate::locator::LocatorSpec;
use crate::Session;
use tracing::{debug, info, instrument, warn};

fn listing_nav_link() -> LocatorSpec {
    LocatorSpec::parse(
        "jobs navigation link",
        &[
            "css:a[href*=\"/jobs\"]",
            "css:a[href*=\"/processes\"]",
            "text:Jobs",
            "text:Processes",
        ],
    )
}

/// At least one row-shaped element; the listing-page sanity check
fn listing_marker() -> LocatorSpec {
    LocatorSpec::parse(
        "listing row marker",
        &[
            "testid:job",
            "testid:process",
            "css:tbody tr",
            "css:[class*=\"job\"]",
            "css:[class*=\"process\"]",
        ],
    )
}

/// Resolve and activate a navigation control for the listing view, falling
/// back to direct navigation to the conventional listing path. Fails only if
/// both routes are spent and the resulting view has nothing row-shaped in it.
#[instrument(skip(session))]
pub async fn navigate_to_listing(session: &Session) -> Result<(), AutomationError> {
    let locator = session.locator();
    let timeout = session.config().timeout();

    match locator.resolve(&listing_nav_link(), None).await {
        Ok(link) => {
            link.click().await?;
            session.driver().wait_for_settle(timeout).await?;
            info!("reached listing view via navigation link");
            return Ok(());
        }
        Err(AutomationError::ElementNotFound(_)) | Err(AutomationError::Timeout(_)) => {
            debug!("no navigation link resolved, considering direct navigation");
        }
        Err(e) => return Err(e),
    }

    let current = session.driver().current_url().await?;
    if current.contains("/jobs") || current.contains("/processes") {
        info!("already on the listing view");
        return Ok(());
    }

    let listing_url = session.config().listing_url();
    warn!("falling back to direct navigation: {listing_url}");
    session.driver().goto(&listing_url).await?;
    session.driver().wait_for_settle(timeout).await?;

    if locator.any_visible(&listing_marker()).await? {
        Ok(())
    } else {
        Err(AutomationError::NavigationFailed(
            "no navigation link resolved and the fallback view shows no row-shaped elements"
                .to_string(),
        ))
    }
}
