use crate::browser::Locator::{Css, Role, Text};
use crate::browser::{BrowsingSession, Lookup, Strategy, click_first};
use crate::error::AgentError;
use crate::models::event::RecruiterContactRecord;
use crate::models::job::JobCandidate;
use crate::models::recruiter::RecruiterInfo;
use crate::outreach::linkedin::SocialChannel;
use crate::store::{EventSink, best_effort};

/// Text-input-like controls that can hold a message.
pub const MESSAGE_BOX: &[Strategy] = &[
    Strategy::new("textarea", Css("textarea")),
    Strategy::new("contenteditable", Css("div[contenteditable='true']")),
    Strategy::new("text-input", Css("input[type='text'], input[type='search']")),
];

pub const SEND: &[Strategy] = &[
    Strategy::new("send-button", Text { tag: "button", text: "send" }),
    Strategy::new("aria-send", Role { role: "button", name: "send" }),
    Strategy::new("send-label", Css("button[aria-label*='Send']")),
];

/// Which channel carried an outreach attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    InSite,
    Social,
    /// Left in the contact log for manual follow-up.
    ContactLogged,
    /// Messaging declined for this run.
    Skipped,
}

impl Delivery {
    /// True when a message actually went out.
    pub fn delivered(self) -> bool {
        matches!(self, Delivery::InSite | Delivery::Social)
    }
}

/// Fill the first usable message box on the current page and send it.
/// Without a send control the box's form is submitted instead.
pub async fn send_in_site(session: &mut dyn BrowsingSession, message: &str) -> Result<(), AgentError> {
    for strategy in MESSAGE_BOX {
        let input = match session.find_element(&strategy.locator).await {
            Lookup::Found(el) if el.is_actionable() => el,
            _ => continue,
        };
        if let Err(e) = session.fill(&input, message).await {
            tracing::debug!(strategy = strategy.name, "fill failed: {e}");
            continue;
        }
        if let Some((send, _)) = click_first(session, SEND).await {
            tracing::debug!(box_strategy = strategy.name, send, "Message sent");
            return Ok(());
        }
        match session.submit(&input).await {
            Ok(()) => return Ok(()),
            Err(e) => tracing::debug!(strategy = strategy.name, "submit failed: {e}"),
        }
    }
    Err(AgentError::Dispatch("no usable message box on the page".into()))
}

/// Try each channel in order and stop at the first that works. The contact
/// log is the terminal fallback and always succeeds from the caller's view.
pub async fn dispatch(
    session: &mut dyn BrowsingSession,
    social: Option<&mut SocialChannel>,
    sink: &dyn EventSink,
    job: &JobCandidate,
    recruiter: &RecruiterInfo,
    role_hint: &str,
    message: &str,
) -> Delivery {
    match send_in_site(session, message).await {
        Ok(()) => {
            tracing::info!(recruiter = recruiter.salutation(), "Messaged recruiter on site");
            return Delivery::InSite;
        }
        Err(e) => tracing::debug!("In-site messaging unavailable: {e}"),
    }

    if let Some(channel) = social {
        match channel
            .reach(recruiter.name.as_deref(), role_hint, &job.company, message)
            .await
        {
            Ok(()) => {
                tracing::info!(recruiter = recruiter.salutation(), "Reached recruiter on LinkedIn");
                return Delivery::Social;
            }
            Err(e) => tracing::warn!("LinkedIn outreach failed: {e}"),
        }
    }

    log_contact(sink, job, recruiter);
    Delivery::ContactLogged
}

pub fn log_contact(sink: &dyn EventSink, job: &JobCandidate, recruiter: &RecruiterInfo) {
    tracing::info!(
        hr_name = recruiter.salutation(),
        "Recruiter contact saved for manual follow-up"
    );
    best_effort(
        "recruiter contact",
        sink.record_contact(&RecruiterContactRecord::for_job(job, recruiter)),
    );
}
