use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use crate::browser::Locator::{Css, Role, Text};
use crate::browser::{BrowsingSession, Lookup, Strategy, click_first, first_match};
use crate::config::Credentials;
use crate::error::AgentError;
use crate::outreach::dispatcher::{MESSAGE_BOX, SEND};

pub const LOGIN_URL: &str = "https://www.linkedin.com/login";
const PEOPLE_SEARCH_URL: &str = "https://www.linkedin.com/search/results/people/";

/// Connection notes are capped well below a direct message.
pub const MAX_NOTE_CHARS: usize = 275;

const USERNAME: Strategy = Strategy::new("username", Css("input#username"));
const PASSWORD: Strategy = Strategy::new("password", Css("input#password"));
const SIGN_IN: &[Strategy] = &[
    Strategy::new("sign-in-button", Text { tag: "button", text: "sign in" }),
    Strategy::new("submit-button", Css("button[type='submit']")),
];

const PROFILE_LINK: &[Strategy] = &[
    Strategy::new("result-title-link", Css("span.entity-result__title-text a[href*='/in/']")),
    Strategy::new("any-profile-link", Css("a[href*='/in/']")),
];

const MESSAGE_BUTTON: &[Strategy] = &[
    Strategy::new("message-button", Text { tag: "button", text: "message" }),
    Strategy::new("message-link", Text { tag: "a", text: "message" }),
];

const CONNECT_BUTTON: &[Strategy] = &[
    Strategy::new("connect-button", Text { tag: "button", text: "connect" }),
    Strategy::new("aria-connect", Role { role: "button", name: "connect" }),
];

const ADD_NOTE: &[Strategy] = &[
    Strategy::new("add-note-button", Text { tag: "button", text: "add a note" }),
    Strategy::new("aria-add-note", Role { role: "button", name: "add a note" }),
];

const NOTE_BOX: &[Strategy] = &[
    Strategy::new("custom-message", Css("textarea[name='message']")),
    Strategy::new("note-textarea", Css("textarea")),
];

/// Collapse whitespace and cap at `MAX_NOTE_CHARS`, marking a cut with `...`.
pub fn linkedin_note_from(message: &str) -> String {
    let normalized = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= MAX_NOTE_CHARS {
        return normalized;
    }
    let head: String = normalized.chars().take(MAX_NOTE_CHARS - 3).collect();
    format!("{}...", head.trim_end())
}

/// People search by recruiter name and company, or role and company when no
/// name is known.
pub fn people_search_url(name: Option<&str>, role_hint: &str, company: &str) -> String {
    let lead = name.filter(|n| !n.trim().is_empty()).unwrap_or(role_hint);
    let keywords = format!("{} {}", lead.trim(), company.trim());
    format!(
        "{PEOPLE_SEARCH_URL}?keywords={}",
        utf8_percent_encode(keywords.trim(), NON_ALPHANUMERIC)
    )
}

/// Secondary outreach channel with its own logged-in session.
pub struct SocialChannel {
    session: Box<dyn BrowsingSession>,
    settle_timeout: Duration,
}

impl SocialChannel {
    /// Log in and keep the session. Landing back on a login or checkpoint
    /// page counts as a failed login.
    pub async fn connect(
        mut session: Box<dyn BrowsingSession>,
        credentials: &Credentials,
        settle_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let result = login(session.as_mut(), credentials, settle_timeout).await;
        if let Err(e) = result {
            if let Err(close_err) = session.close().await {
                tracing::debug!("Closing social session failed: {close_err}");
            }
            return Err(e);
        }
        Ok(Self {
            session,
            settle_timeout,
        })
    }

    /// Find the recruiter (or someone in the role at the company) and either
    /// message them or send a connection request with a short note.
    pub async fn reach(
        &mut self,
        recruiter_name: Option<&str>,
        role_hint: &str,
        company: &str,
        message: &str,
    ) -> Result<(), AgentError> {
        let session = self.session.as_mut();
        let search = people_search_url(recruiter_name, role_hint, company);
        session.navigate(&search).await?;
        settle(session, self.settle_timeout).await;

        let (_, profile) = first_match(session, PROFILE_LINK, |el| el.visible)
            .await
            .ok_or_else(|| AgentError::Dispatch("no matching profile".into()))?;
        session.click(&profile).await?;
        settle(session, self.settle_timeout).await;

        if click_first(session, MESSAGE_BUTTON).await.is_some() {
            settle(session, self.settle_timeout).await;
            let (_, input) = first_match(session, MESSAGE_BOX, |el| el.is_actionable())
                .await
                .ok_or_else(|| AgentError::Dispatch("message box did not open".into()))?;
            session.fill(&input, message).await?;
            return match click_first(session, SEND).await {
                Some(_) => Ok(()),
                None => session.submit(&input).await,
            };
        }

        click_first(session, CONNECT_BUTTON)
            .await
            .ok_or_else(|| AgentError::Dispatch("profile offers neither message nor connect".into()))?;
        click_first(session, ADD_NOTE)
            .await
            .ok_or_else(|| AgentError::Dispatch("connect dialog has no note option".into()))?;
        let (_, note_box) = first_match(session, NOTE_BOX, |el| el.is_actionable())
            .await
            .ok_or_else(|| AgentError::Dispatch("note box not found".into()))?;
        session.fill(&note_box, &linkedin_note_from(message)).await?;
        click_first(session, SEND)
            .await
            .map(|_| ())
            .ok_or_else(|| AgentError::Dispatch("send invitation button not found".into()))
    }

    #[cfg(test)]
    pub(crate) fn over(session: Box<dyn BrowsingSession>, settle_timeout: Duration) -> Self {
        Self {
            session,
            settle_timeout,
        }
    }

    pub async fn close(&mut self) {
        if let Err(e) = self.session.close().await {
            tracing::warn!("Closing social session failed: {e}");
        }
    }
}

async fn settle(session: &mut dyn BrowsingSession, timeout: Duration) {
    if session.wait_for_quiescence(timeout).await == Lookup::TimedOut {
        tracing::debug!("Social page still busy, proceeding");
    }
}

async fn login(
    session: &mut dyn BrowsingSession,
    credentials: &Credentials,
    settle_timeout: Duration,
) -> Result<(), AgentError> {
    session.navigate(LOGIN_URL).await?;
    settle(session, settle_timeout).await;

    let user = session
        .wait_for(&USERNAME.locator, settle_timeout)
        .await
        .found()
        .ok_or_else(|| AgentError::Authentication("LinkedIn login form not found".into()))?;
    session.fill(&user, &credentials.username).await?;
    let pass = session
        .find_element(&PASSWORD.locator)
        .await
        .found()
        .ok_or_else(|| AgentError::Authentication("LinkedIn password field not found".into()))?;
    session.fill(&pass, &credentials.password).await?;

    if click_first(session, SIGN_IN).await.is_none() {
        session.submit(&pass).await?;
    }
    settle(session, settle_timeout).await;

    let landed = session.current_url().unwrap_or_default();
    if landed.contains("/login") || landed.contains("/checkpoint") || landed.contains("/uas/") {
        return Err(AgentError::Authentication(format!(
            "LinkedIn did not accept the login (landed on {landed})"
        )));
    }
    tracing::info!("LinkedIn session ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::browser::fake::FakeSession;

    const LOGIN_PAGE: &str = r#"
        <form action="/checkpoint/lg/login-submit" method="post">
          <input id="username" name="session_key">
          <input id="password" name="session_password" type="password">
          <button type="submit">Sign in</button>
        </form>"#;
    const FEED: &str = "https://www.linkedin.com/checkpoint/lg/login-submit";

    fn credentials() -> Credentials {
        Credentials {
            username: "me@example.com".into(),
            password: "hunter2".into(),
        }
    }

    #[test]
    fn short_notes_are_only_normalized() {
        assert_eq!(linkedin_note_from("  Hi\n\nPriya,\tthanks  "), "Hi Priya, thanks");
    }

    #[test]
    fn long_notes_are_cut_with_ellipsis() {
        let note = linkedin_note_from(&"word ".repeat(200));
        assert!(note.chars().count() <= MAX_NOTE_CHARS);
        assert!(note.ends_with("..."));
    }

    #[test]
    fn note_of_exactly_the_limit_is_unchanged() {
        let msg = "a".repeat(MAX_NOTE_CHARS);
        assert_eq!(linkedin_note_from(&msg), msg);
    }

    #[test]
    fn search_uses_name_or_role() {
        assert_eq!(
            people_search_url(Some("Priya Sharma"), "Data Scientist", "Acme"),
            "https://www.linkedin.com/search/results/people/?keywords=Priya%20Sharma%20Acme"
        );
        assert_eq!(
            people_search_url(None, "Data Scientist", "Acme"),
            "https://www.linkedin.com/search/results/people/?keywords=Data%20Scientist%20Acme"
        );
    }

    #[tokio::test]
    async fn login_rejected_when_checkpoint_remains() {
        let session = FakeSession::new().page(LOGIN_URL, LOGIN_PAGE);
        let err = SocialChannel::connect(Box::new(session), &credentials(), Duration::ZERO)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::Authentication(_)));
        assert!(err.to_string().contains(FEED));
    }

    #[tokio::test]
    async fn connect_with_note_when_no_message_button() {
        let fills = Arc::new(Mutex::new(Vec::new()));
        let mut channel = SocialChannel {
            session: Box::new(connect_only_profile("Priya").sharing_fills(fills.clone())),
            settle_timeout: Duration::ZERO,
        };
        let message = "Hello  there\n".repeat(100);
        channel.reach(Some("Priya"), "Data Scientist", "Acme", &message).await.unwrap();

        let fills = fills.lock().unwrap();
        assert_eq!(fills.len(), 1);
        let (field, note) = &fills[0];
        assert_eq!(field, "message");
        assert!(note.chars().count() <= MAX_NOTE_CHARS);
        assert!(note.starts_with("Hello there Hello there"));
        assert!(note.ends_with("..."));
    }

    /// A search result for `name` whose profile only offers Connect.
    fn connect_only_profile(name: &str) -> FakeSession {
        let search = people_search_url(Some(name), "Data Scientist", "Acme");
        FakeSession::new()
            .page(&search, r#"<a href="/in/priya">Priya</a>"#)
            .page(
                "https://www.linkedin.com/in/priya",
                r#"<button>Connect</button><button>Add a note</button>
                   <textarea name="message"></textarea><button>Send</button>"#,
            )
    }

    #[tokio::test]
    async fn missing_profile_is_a_dispatch_failure() {
        let search = people_search_url(None, "Data Scientist", "Acme");
        let session = FakeSession::new().page(&search, "<p>No results</p>");
        let mut channel = SocialChannel {
            session: Box::new(session),
            settle_timeout: Duration::ZERO,
        };
        let err = channel.reach(None, "Data Scientist", "Acme", "Hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Dispatch(_)));
    }
}
