use std::time::Duration;

use crate::browser::Locator::{Css, Text};
use crate::browser::{BrowsingSession, Lookup, Strategy, click_first};
use crate::config::Credentials;
use crate::error::AgentError;

pub const LOGIN_URL: &str = "https://www.naukri.com/nlogin/login";

const USERNAME: Strategy = Strategy::new("username-field", Css("#usernameField"));
const PASSWORD: Strategy = Strategy::new("password-field", Css("#passwordField"));
const SUBMIT: &[Strategy] = &[
    Strategy::new("login-button", Text { tag: "button", text: "login" }),
    Strategy::new("submit-button", Css("button[type='submit']")),
];

/// Load the login page, retrying exactly once when the load times out.
async fn open_login_page(session: &mut dyn BrowsingSession) -> Result<(), AgentError> {
    match session.navigate(LOGIN_URL).await {
        Err(AgentError::NavigationTimeout(_)) => {
            tracing::warn!("Login page timed out, retrying once");
            session.navigate(LOGIN_URL).await.map_err(|e| {
                AgentError::Authentication(format!("login page unavailable after retry: {e}"))
            })
        }
        Err(e) => Err(AgentError::Authentication(format!("login page unavailable: {e}"))),
        Ok(()) => Ok(()),
    }
}

/// Sign in to the job site. Any failure here ends the run.
pub async fn authenticate(
    session: &mut dyn BrowsingSession,
    credentials: &Credentials,
    settle_timeout: Duration,
) -> Result<(), AgentError> {
    open_login_page(session).await?;
    if session.wait_for_quiescence(settle_timeout).await == Lookup::TimedOut {
        tracing::debug!("Login page still busy, proceeding");
    }

    let user = match session.wait_for(&USERNAME.locator, settle_timeout).await {
        Lookup::Found(el) => el,
        Lookup::NotFound | Lookup::TimedOut => {
            return Err(AgentError::Authentication("login form not found".into()));
        }
    };
    session
        .fill(&user, &credentials.username)
        .await
        .map_err(|e| AgentError::Authentication(format!("could not fill username: {e}")))?;

    let pass = session
        .find_element(&PASSWORD.locator)
        .await
        .found()
        .ok_or_else(|| AgentError::Authentication("password field not found".into()))?;
    session
        .fill(&pass, &credentials.password)
        .await
        .map_err(|e| AgentError::Authentication(format!("could not fill password: {e}")))?;

    match click_first(session, SUBMIT).await {
        Some((strategy, _)) => tracing::debug!(strategy, "Login submitted"),
        None => session
            .submit(&pass)
            .await
            .map_err(|e| AgentError::Authentication(format!("could not submit login form: {e}")))?,
    }
    if session.wait_for_quiescence(settle_timeout).await == Lookup::TimedOut {
        tracing::debug!("Post-login page still busy, proceeding");
    }

    let still_on_form = session.current_url().is_some_and(|u| u.contains("/nlogin/login"))
        && session.find_element(&PASSWORD.locator).await.found().is_some();
    if still_on_form {
        return Err(AgentError::Authentication(
            "still on the login form after submitting, check NAUKRI_EMAIL and NAUKRI_PASSWORD".into(),
        ));
    }

    tracing::info!(user = %credentials.username, "Logged in");
    Ok(())
}
