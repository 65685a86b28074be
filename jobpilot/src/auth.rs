//! Session state classification and credential submission.
//!
//! State is derived fresh on every check and never cached: the view can
//! change underneath us after any navigation or login attempt. Login-prompt
//! indicators take precedence over authenticated-area indicators, so a stale
//! positive element can never mask a fresh login screen.

use crate::errors::AutomationError;
use crate::locator::LocatorSpec;
use crate::Session;
use tracing::{debug, info, instrument, warn};

/// Classification of the current view's authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
    /// Neither indicator set matched. A legitimate terminal classification,
    /// handled by falling back to the manual-intervention path.
    Ambiguous,
}

/// Result of one automated authentication attempt. Transport and navigation
/// errors surface as `Err`, which is fatal to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    /// The session is left open and interactive; the caller hands control to
    /// a human operator and blocks on a continuation signal. SSO and CAPTCHA
    /// flows land here by design.
    ManualRequired,
}

/// Elements implying an authenticated area
fn positive_indicators() -> LocatorSpec {
    LocatorSpec::parse(
        "authenticated-area indicator",
        &[
            "text:Jobs",
            "text:Processes",
            "text:Robots",
            "text:Orchestrator",
            "testid:menu",
            "role:navigation",
            "css:nav",
        ],
    )
}

/// Elements implying a login prompt; these win over positive indicators
fn negative_indicators() -> LocatorSpec {
    LocatorSpec::parse(
        "login-prompt indicator",
        &[
            "text:Sign in",
            "text:Login",
            "css:input[type=\"password\"]",
        ],
    )
}

fn username_field() -> LocatorSpec {
    LocatorSpec::parse(
        "username field",
        &[
            "css:input[name=\"email\"]",
            "css:input[name=\"username\"]",
            "css:input[type=\"email\"]",
            "placeholder*:email",
            "placeholder*:username",
        ],
    )
}

fn password_field() -> LocatorSpec {
    LocatorSpec::parse(
        "password field",
        &[
            "css:input[name=\"password\"]",
            "css:input[type=\"password\"]",
        ],
    )
}

fn submit_button() -> LocatorSpec {
    LocatorSpec::parse(
        "submit button",
        &[
            "css:button[type=\"submit\"]",
            "text:Sign in",
            "text:Login",
            "text:Log in",
            "css:input[type=\"submit\"]",
        ],
    )
}

/// Classify the current view. Negative indicators take precedence
/// unconditionally; with neither set matching, the state is `Ambiguous`.
#[instrument(level = "debug", skip(session))]
pub async fn detect(session: &Session) -> Result<AuthState, AutomationError> {
    let locator = session.locator();

    if locator.any_visible(&negative_indicators()).await? {
        debug!("login-prompt indicator present");
        return Ok(AuthState::Unauthenticated);
    }

    if locator.any_visible(&positive_indicators()).await? {
        debug!("authenticated-area indicator present");
        return Ok(AuthState::Authenticated);
    }

    debug!("no indicator matched, state is ambiguous");
    Ok(AuthState::Ambiguous)
}

/// Drive one credential submission attempt. Called only when `detect`
/// reported `Unauthenticated`; performs at most one attempt per run, because
/// wrong credentials and an SSO redirect are indistinguishable from here.
#[instrument(skip(session))]
pub async fn authenticate(session: &Session) -> Result<AuthOutcome, AutomationError> {
    let config = session.config();
    if !config.has_credentials() {
        info!("no credentials configured, handing off to the operator");
        return Ok(AuthOutcome::ManualRequired);
    }

    let locator = session.locator();

    let username = match locator.resolve(&username_field(), None).await {
        Ok(handle) => handle,
        Err(AutomationError::ElementNotFound(_)) | Err(AutomationError::Timeout(_)) => {
            warn!("could not find a username field, handing off to the operator");
            return Ok(AuthOutcome::ManualRequired);
        }
        Err(e) => return Err(e),
    };
    let password = match locator.resolve(&password_field(), None).await {
        Ok(handle) => handle,
        Err(AutomationError::ElementNotFound(_)) | Err(AutomationError::Timeout(_)) => {
            warn!("could not find a password field, handing off to the operator");
            return Ok(AuthOutcome::ManualRequired);
        }
        Err(e) => return Err(e),
    };

    // has_credentials() held above, so both values exist
    let user = config.username.clone().unwrap_or_default();
    let pass = config.password.clone().unwrap_or_default();

    username.fill(&user).await?;
    password.fill(&pass).await?;
    info!("credentials filled, submitting");

    match locator.resolve(&submit_button(), None).await {
        Ok(button) => button.click().await?,
        Err(AutomationError::ElementNotFound(_)) | Err(AutomationError::Timeout(_)) => {
            warn!("no submit control resolved, pressing Enter on the password field");
            password.press_key("Enter").await?;
        }
        Err(e) => return Err(e),
    }

    session.driver().wait_for_settle(config.timeout()).await?;

    match detect(session).await? {
        AuthState::Authenticated => {
            info!("login successful");
            Ok(AuthOutcome::Success)
        }
        state => {
            warn!(?state, "login attempt did not authenticate; not retrying");
            Ok(AuthOutcome::ManualRequired)
        }
    }
}
