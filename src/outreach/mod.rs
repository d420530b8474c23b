// Recruiter outreach after a successful application: compose a message and
// hand it to the first channel that takes it.

pub mod composer;
pub mod dispatcher;
pub mod linkedin;

use crate::apply::ApplicationReport;
use crate::browser::BrowsingSession;
use crate::models::job::JobCandidate;
use crate::store::EventSink;

use self::composer::{Composer, Pitch};
use self::dispatcher::{Delivery, dispatch, log_contact};
use self::linkedin::SocialChannel;

/// Outreach state for one sweep.
pub struct Outreach<'a> {
    /// None when AI messaging is declined for the run.
    composer: Option<Composer>,
    social: Option<SocialChannel>,
    sink: &'a dyn EventSink,
    resume: &'a str,
}

impl<'a> Outreach<'a> {
    pub fn new(
        composer: Option<Composer>,
        social: Option<SocialChannel>,
        sink: &'a dyn EventSink,
        resume: &'a str,
    ) -> Self {
        Self {
            composer,
            social,
            sink,
            resume,
        }
    }

    /// Message the recruiter behind `job`. With messaging declined only the
    /// contact details are kept, and only when there are any.
    pub async fn follow_up(
        &mut self,
        session: &mut dyn BrowsingSession,
        job: &JobCandidate,
        report: &ApplicationReport,
    ) -> Delivery {
        let Some(composer) = &self.composer else {
            if !report.recruiter.is_empty() {
                log_contact(self.sink, job, &report.recruiter);
            }
            return Delivery::Skipped;
        };

        let message = composer
            .compose(&Pitch {
                resume: self.resume,
                recruiter_name: report.recruiter.salutation(),
                role_hint: &report.role_hint,
                job_link: &job.link,
                company: &job.company,
            })
            .await;

        dispatch(
            session,
            self.social.as_mut(),
            self.sink,
            job,
            &report.recruiter,
            &report.role_hint,
            &message,
        )
        .await
    }

    /// Release the social session, if one was opened.
    pub async fn close(&mut self) {
        if let Some(social) = self.social.as_mut() {
            social.close().await;
        }
    }
}
