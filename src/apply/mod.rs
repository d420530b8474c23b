// Per-job application pipeline: open the posting, trigger an apply control,
// classify what the click did, then read whatever recruiter details exist.

pub mod recruiter;
pub mod strategies;

use std::time::Duration;

use url::Url;

use crate::browser::{BrowsingSession, Lookup, Strategy, click_first};
use crate::error::AgentError;
use crate::models::event::ExternalApplicationRecord;
use crate::models::job::JobCandidate;
use crate::models::recruiter::RecruiterInfo;
use crate::store::{EventSink, best_effort};

const MAX_ROLE_HINT_CHARS: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    AppliedInternal,
    AppliedExternal { url: String },
    NotApplied,
}

impl ApplyOutcome {
    pub fn applied(&self) -> bool {
        !matches!(self, ApplyOutcome::NotApplied)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationReport {
    pub outcome: ApplyOutcome,
    pub recruiter: RecruiterInfo,
    /// Short role label for outreach, taken from the page title when usable.
    pub role_hint: String,
}

impl ApplicationReport {
    pub fn applied(&self) -> bool {
        self.outcome.applied()
    }
}

/// What a successful click left behind.
#[derive(Debug)]
struct Attempt {
    strategy: &'static str,
    company_site: bool,
    opened: Option<String>,
    before: Option<String>,
    after: Option<String>,
}

#[derive(Debug)]
enum Stage {
    Start,
    Navigated { landing: String },
    ActionAttempted { landing: String, attempt: Option<Attempt> },
    Classified { landing: String, outcome: ApplyOutcome },
    MetadataExtracted { outcome: ApplyOutcome, recruiter: RecruiterInfo },
    Done(ApplicationReport),
}

/// True when `url` is on `site_domain` or one of its subdomains. Anything
/// that does not parse as a URL with a host counts as staying on the site.
pub fn is_own_domain(url: &str, site_domain: &str) -> bool {
    let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
        return true;
    };
    let domain = site_domain.to_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Outcome of a click that succeeded. A new browsing context or a
/// navigation off the site is external; anything else stayed internal.
pub fn classify(
    opened: Option<&str>,
    before: Option<&str>,
    after: Option<&str>,
    site_domain: &str,
) -> ApplyOutcome {
    if let Some(url) = opened {
        return ApplyOutcome::AppliedExternal { url: url.to_string() };
    }
    match after {
        Some(url) if Some(url) != before && !is_own_domain(url, site_domain) => {
            ApplyOutcome::AppliedExternal { url: url.to_string() }
        }
        _ => ApplyOutcome::AppliedInternal,
    }
}

/// Role label from a page title like `Data Scientist - Acme | Naukri.com`.
pub fn role_hint(page_title: Option<&str>, job: &JobCandidate) -> String {
    page_title
        .and_then(|t| t.split('|').next())
        .map(str::trim)
        .filter(|t| !t.is_empty() && t.chars().count() <= MAX_ROLE_HINT_CHARS)
        .unwrap_or(&job.title)
        .to_string()
}

pub struct ApplicationDriver<'a> {
    sink: &'a dyn EventSink,
    site_domain: &'a str,
    settle_timeout: Duration,
}

impl<'a> ApplicationDriver<'a> {
    pub fn new(sink: &'a dyn EventSink, site_domain: &'a str, settle_timeout: Duration) -> Self {
        Self {
            sink,
            site_domain,
            settle_timeout,
        }
    }

    /// Run one posting through the pipeline. Only a failure to load the
    /// posting at all is an error; every later miss degrades to the next step.
    pub async fn process(
        &self,
        session: &mut dyn BrowsingSession,
        job: &JobCandidate,
    ) -> Result<ApplicationReport, AgentError> {
        let mut external_logged = false;
        let mut stage = Stage::Start;

        loop {
            tracing::trace!(?stage, "stage");
            stage = match stage {
                Stage::Start => {
                    match session.navigate(&job.link).await {
                        Ok(()) => {}
                        Err(AgentError::NavigationTimeout(_)) => {
                            tracing::warn!(link = %job.link, "Posting load timed out, continuing with what rendered");
                        }
                        Err(e) => {
                            return Err(AgentError::JobProcessing(format!(
                                "could not open {}: {e}",
                                job.link
                            )));
                        }
                    }
                    self.settle(session).await;
                    let landing = session.current_url().unwrap_or_else(|| job.link.clone());
                    Stage::Navigated { landing }
                }

                Stage::Navigated { landing } => {
                    let attempt = match self.attempt(session, strategies::APPLY, false).await {
                        Some(attempt) => Some(attempt),
                        None => {
                            tracing::debug!("No apply control, looking for a company-site link");
                            self.attempt(session, strategies::COMPANY_SITE, true).await
                        }
                    };
                    Stage::ActionAttempted { landing, attempt }
                }

                Stage::ActionAttempted { landing, attempt } => {
                    let outcome = match attempt {
                        None => ApplyOutcome::NotApplied,
                        Some(a) => {
                            let outcome = classify(
                                a.opened.as_deref(),
                                a.before.as_deref(),
                                a.after.as_deref(),
                                self.site_domain,
                            );
                            tracing::debug!(strategy = a.strategy, ?outcome, "Apply control clicked");
                            match outcome {
                                ApplyOutcome::AppliedInternal if a.company_site => ApplyOutcome::NotApplied,
                                other => other,
                            }
                        }
                    };
                    Stage::Classified { landing, outcome }
                }

                Stage::Classified { landing, outcome } => {
                    match &outcome {
                        ApplyOutcome::AppliedExternal { url } => {
                            tracing::info!(title = %job.title, external = %url, "Applied via external site");
                            if !external_logged {
                                best_effort(
                                    "external application",
                                    self.sink.record_external(&ExternalApplicationRecord::for_job(job, url)),
                                );
                                external_logged = true;
                            }
                        }
                        ApplyOutcome::AppliedInternal => tracing::info!(title = %job.title, "Applied on site"),
                        ApplyOutcome::NotApplied => tracing::info!(title = %job.title, "No usable apply control"),
                    }

                    self.return_to(session, &landing).await;
                    let recruiter = recruiter::extract(session, self.site_domain).await;
                    if recruiter.is_empty() {
                        tracing::debug!("No recruiter details on the page");
                    }
                    Stage::MetadataExtracted { outcome, recruiter }
                }

                Stage::MetadataExtracted { outcome, recruiter } => {
                    let title = session.title().await;
                    Stage::Done(ApplicationReport {
                        outcome,
                        recruiter,
                        role_hint: role_hint(title.as_deref(), job),
                    })
                }

                Stage::Done(report) => return Ok(report),
            };
        }
    }

    async fn settle(&self, session: &mut dyn BrowsingSession) {
        if session.wait_for_quiescence(self.settle_timeout).await == Lookup::TimedOut {
            tracing::debug!("Page still busy after {:?}, proceeding", self.settle_timeout);
        }
    }

    async fn attempt(
        &self,
        session: &mut dyn BrowsingSession,
        list: &[Strategy],
        company_site: bool,
    ) -> Option<Attempt> {
        let before = session.current_url();
        let (strategy, _) = click_first(session, list).await?;
        let opened = session.take_new_context().await;
        self.settle(session).await;
        Some(Attempt {
            strategy,
            company_site,
            opened,
            before,
            after: session.current_url(),
        })
    }

    /// Metadata lives on the posting; go back to it if the click moved us.
    async fn return_to(&self, session: &mut dyn BrowsingSession, landing: &str) {
        if session.current_url().as_deref() == Some(landing) {
            return;
        }
        match session.navigate(landing).await {
            Ok(()) => self.settle(session).await,
            Err(e) => tracing::warn!(url = landing, "Could not return to posting: {e}"),
        }
    }
}
