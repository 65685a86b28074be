//! Sequencing for one run: state detection, authentication, navigation,
//! a single discovery pass, then per-job triggering in request order.

use crate::auth::{self, AuthOutcome, AuthState};
use crate::discovery::{self, DiscoveredJob};
use crate::errors::AutomationError;
use crate::{nav, trigger, Session};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Pause between consecutive trigger dispatches, so the console can absorb
/// one action before the next one lands.
const INTER_TRIGGER_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerStatus {
    Triggered,
    NotFound,
    TriggerFailed,
}

/// Per-job outcome. Failures at this level are values, never faults: one bad
/// job name must not abort a multi-job run.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub name: String,
    pub status: TriggerStatus,
    /// Artifact identifier of the diagnostic capture, when one was taken
    pub diagnostic: Option<String>,
}

/// Aggregated outcomes for one run, in request order.
#[derive(Debug, Default, Serialize)]
pub struct RunResult {
    outcomes: IndexMap<String, ActionOutcome>,
}

impl RunResult {
    pub fn record(&mut self, outcome: ActionOutcome) {
        self.outcomes.insert(outcome.name.clone(), outcome);
    }

    pub fn get(&self, name: &str) -> Option<&ActionOutcome> {
        self.outcomes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes.values()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_triggered(&self) -> bool {
        self.outcomes
            .values()
            .all(|outcome| outcome.status == TriggerStatus::Triggered)
    }
}

/// Blocking wait for an external continuation signal, used when automated
/// authentication hands off to a human operator. Lives outside the engine's
/// own control flow so the engine stays testable without interactive input.
#[async_trait::async_trait]
pub trait ContinuationGate: Send + Sync {
    async fn wait_for_operator(&self) -> Result<(), AutomationError>;
}

/// Gate for unattended runs: manual intervention is not available, so the
/// hand-off becomes a fatal authentication failure.
pub struct Unattended;

#[async_trait::async_trait]
impl ContinuationGate for Unattended {
    async fn wait_for_operator(&self) -> Result<(), AutomationError> {
        Err(AutomationError::AuthenticationFailed(
            "manual intervention required but no operator is attached".to_string(),
        ))
    }
}

/// Owns the session for exactly one invocation and guarantees teardown on
/// every exit path. Strictly sequential: concurrent interaction with the
/// same view is unsafe, so there is no parallel dispatch of triggers.
pub struct Orchestrator {
    session: Session,
    gate: Arc<dyn ContinuationGate>,
}

impl Orchestrator {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            gate: Arc::new(Unattended),
        }
    }

    /// Attach an operator hand-off gate (e.g. a console prompt in the CLI)
    pub fn with_continuation(mut self, gate: Arc<dyn ContinuationGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Trigger the named jobs, in request order. Consumes the orchestrator:
    /// the session is closed whatever happens.
    #[instrument(skip(self, names), fields(requested = names.len()))]
    pub async fn run(self, names: &[String]) -> Result<RunResult, AutomationError> {
        let result = self.run_inner(names).await;
        self.session.close().await;
        result
    }

    /// Trigger every job found by a single discovery pass at the start of
    /// the run. Jobs appearing later (pagination, live updates) are out of
    /// scope for this run.
    #[instrument(skip(self))]
    pub async fn run_all(self) -> Result<RunResult, AutomationError> {
        let result = self.run_all_inner().await;
        self.session.close().await;
        result
    }

    /// Names of every job on the listing view, in listing order.
    #[instrument(skip(self))]
    pub async fn list_jobs(self) -> Result<Vec<String>, AutomationError> {
        let result = self.list_jobs_inner().await;
        self.session.close().await;
        result
    }

    async fn run_inner(&self, names: &[String]) -> Result<RunResult, AutomationError> {
        // An empty request performs no authentication or navigation; the
        // session was established, and that is all.
        if names.is_empty() {
            return Ok(RunResult::default());
        }

        let jobs = self.reach_listing().await?;
        self.trigger_each(&jobs, names).await
    }

    async fn run_all_inner(&self) -> Result<RunResult, AutomationError> {
        let jobs = self.reach_listing().await?;
        let names: Vec<String> = jobs.iter().map(|job| job.name.clone()).collect();
        info!("running all {} discovered jobs", names.len());
        self.trigger_each(&jobs, &names).await
    }

    async fn list_jobs_inner(&self) -> Result<Vec<String>, AutomationError> {
        let jobs = self.reach_listing().await?;
        Ok(jobs.into_iter().map(|job| job.name).collect())
    }

    /// Open the console, establish an authenticated state, navigate to the
    /// listing and run the single discovery pass for this run.
    async fn reach_listing(&self) -> Result<Vec<DiscoveredJob>, AutomationError> {
        self.session.open().await?;
        self.ensure_authenticated().await?;
        nav::navigate_to_listing(&self.session).await?;
        discovery::discover(&self.session).await
    }

    async fn ensure_authenticated(&self) -> Result<(), AutomationError> {
        match auth::detect(&self.session).await? {
            AuthState::Authenticated => {
                info!("already authenticated");
                return Ok(());
            }
            AuthState::Unauthenticated => {
                if auth::authenticate(&self.session).await? == AuthOutcome::Success {
                    return Ok(());
                }
            }
            AuthState::Ambiguous => {
                warn!("authentication state is ambiguous, handing off to the operator");
            }
        }

        // Hand the open session to a human, then take the view as it comes
        // back: the operator's word is the continuation signal.
        self.gate.wait_for_operator().await?;
        let state = auth::detect(&self.session).await?;
        info!(?state, "resuming after operator hand-off");
        Ok(())
    }

    async fn trigger_each(
        &self,
        jobs: &[DiscoveredJob],
        names: &[String],
    ) -> Result<RunResult, AutomationError> {
        let mut result = RunResult::default();
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.session.driver().wait_millis(INTER_TRIGGER_DELAY_MS).await;
            }
            let outcome = trigger::trigger(&self.session, jobs, name).await?;
            result.record(outcome);
        }
        Ok(result)
    }
}
