//! Dispatching the run action against one named job.

use crate::diagnostics::capture_best_effort;
use crate::discovery::DiscoveredJob;
use crate::errors::AutomationError;
use crate::locator::LocatorSpec;
use crate::orchestrator::{ActionOutcome, TriggerStatus};
use crate::Session;
use tracing::{error, info, instrument};

/// The triggering-control cascade, scoped to the matched container: explicit
/// accessible labels first, then button text, title attribute, and finally a
/// generic icon-button class heuristic.
fn run_control() -> LocatorSpec {
    LocatorSpec::parse(
        "run control",
        &[
            "label*:play",
            "label*:run",
            "text:Play",
            "text:Run",
            "title*:play",
            "title*:run",
            "css:[class*=\"play\"]",
            "css:[class*=\"run\"]",
        ],
    )
}

/// Locate `name` among the discovered jobs and dispatch its run control.
///
/// Name matching is exact and case-sensitive: a name printed by the listing
/// command must work unmodified here, so no normalization is applied. Every
/// failure becomes an outcome value with a diagnostic capture; nothing in
/// this call retries, because the dispatched action may not be idempotent
/// against the target system.
#[instrument(skip(session, jobs), fields(job = name))]
pub async fn trigger(
    session: &Session,
    jobs: &[DiscoveredJob],
    name: &str,
) -> Result<ActionOutcome, AutomationError> {
    let Some(job) = jobs.iter().find(|job| job.name == name) else {
        error!("job not present in the discovered listing");
        let diagnostic =
            capture_best_effort(session.diagnostics(), session.driver(), "error").await;
        return Ok(ActionOutcome {
            name: name.to_string(),
            status: TriggerStatus::NotFound,
            diagnostic,
        });
    };

    match session.locator().resolve(&run_control(), Some(&job.handle)).await {
        Ok(control) => match control.click().await {
            Ok(()) => {
                info!("run control dispatched");
                Ok(ActionOutcome {
                    name: name.to_string(),
                    status: TriggerStatus::Triggered,
                    diagnostic: None,
                })
            }
            Err(e) => {
                error!("run control resolved but dispatch failed: {e}");
                let diagnostic =
                    capture_best_effort(session.diagnostics(), session.driver(), "error").await;
                Ok(ActionOutcome {
                    name: name.to_string(),
                    status: TriggerStatus::TriggerFailed,
                    diagnostic,
                })
            }
        },
        Err(AutomationError::ElementNotFound(_)) | Err(AutomationError::Timeout(_)) => {
            error!("job row found but no run control resolved");
            let diagnostic =
                capture_best_effort(session.diagnostics(), session.driver(), "error").await;
            Ok(ActionOutcome {
                name: name.to_string(),
                status: TriggerStatus::TriggerFailed,
                diagnostic,
            })
        }
        Err(e) => Err(e),
    }
}
