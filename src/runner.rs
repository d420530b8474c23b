use std::path::Path;

use rand::seq::SliceRandom;
use tokio::sync::watch;

use crate::apply::{ApplicationDriver, ApplyOutcome};
use crate::auth;
use crate::browser::BrowsingSession;
use crate::browser::http::{HttpSession, SessionOptions};
use crate::collectors::configured_apis;
use crate::collectors::discovery::Discovery;
use crate::collectors::naukri::{SITE_DOMAIN, SiteScraper};
use crate::config::{Config, DiscoveryMode, RunMode, SearchConfig, Settings};
use crate::error::AgentError;
use crate::outreach::Outreach;
use crate::outreach::composer::{Composer, GENERATION_TIMEOUT, GeminiClient};
use crate::outreach::linkedin::SocialChannel;
use crate::pacing::Pacing;
use crate::store::applied::{APPLIED_JOBS_FILE, AppliedStore};
use crate::store::files::FileSink;
use crate::store::{EventSink, best_effort};

/// Counts for one sweep, logged when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub discovered: usize,
    pub attempted: usize,
    pub applied: usize,
    pub external: usize,
    /// Applied jobs whose recruiter got a message in-site or on LinkedIn.
    pub messaged: usize,
    pub failed: usize,
}

/// Validate settings, then run one sweep or keep sweeping until interrupted.
/// Settings problems surface before any session is opened.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let settings = config.settings()?;
    tracing::info!(
        mode = ?config.mode,
        discovery = ?settings.discovery,
        messaging = settings.messaging_enabled(),
        linkedin = settings.linkedin.is_some(),
        pacing_min = settings.pacing.min_secs(),
        pacing_max = settings.pacing.max_secs(),
        "Agent starting"
    );

    let mut shutdown = shutdown_signal();
    match config.mode {
        RunMode::Once => {
            run_once(&settings, shutdown).await?;
        }
        RunMode::Loop => loop {
            tracing::info!("===== Sweep starting =====");
            match run_once(&settings, shutdown.clone()).await {
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => tracing::error!("Sweep failed, retrying next interval: {e}"),
                Ok(_) => {}
            }
            if *shutdown.borrow() {
                tracing::info!("Shutdown signal received, exiting");
                break;
            }

            tracing::info!("Sleeping {} minutes", settings.interval.as_secs() / 60);
            tokio::select! {
                biased;
                Ok(()) = shutdown.changed() => {
                    tracing::info!("Shutdown signal received, exiting");
                    break;
                }
                _ = tokio::time::sleep(settings.interval) => {}
            }
        },
    }

    Ok(())
}

/// Flips to true on ctrl-c. A sweep in progress stops before its next job,
/// so sessions are still closed.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(e) => tracing::warn!("Cannot listen for ctrl-c: {e}"),
        }
    });
    rx
}

fn read_resume(path: &Path) -> Result<String, AgentError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AgentError::Config(format!("cannot read resume {}: {e}", path.display())))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn open_social(settings: &Settings, options: &SessionOptions) -> Option<SocialChannel> {
    let credentials = settings.linkedin.as_ref()?;
    let session = match HttpSession::new(options) {
        Ok(s) => Box::new(s),
        Err(e) => {
            tracing::warn!("LinkedIn session unavailable, continuing without it: {e}");
            return None;
        }
    };
    match SocialChannel::connect(session, credentials, settings.page_timeout).await {
        Ok(channel) => Some(channel),
        Err(e) => {
            tracing::warn!("LinkedIn login failed, continuing without it: {e}");
            None
        }
    }
}

fn composer(settings: &Settings) -> Result<Option<Composer>, AgentError> {
    settings
        .gemini
        .clone()
        .map(|gemini| Ok(Composer::new(Box::new(GeminiClient::new(gemini)?), GENERATION_TIMEOUT)))
        .transpose()
}

/// One full sweep with fresh sessions. Sessions are closed on every path out.
pub async fn run_once(settings: &Settings, shutdown: watch::Receiver<bool>) -> Result<SweepSummary, AgentError> {
    let resume = read_resume(&settings.resume_path)?;
    std::fs::create_dir_all(&settings.state_dir).map_err(|e| {
        AgentError::Config(format!("cannot create state dir {}: {e}", settings.state_dir.display()))
    })?;

    let options = SessionOptions {
        headless: settings.headless,
        page_timeout: settings.page_timeout,
    };
    let mut session = HttpSession::new(&options)?;
    let sink = FileSink::new(&settings.state_dir);
    let apis = configured_apis(settings);
    let scraper = SiteScraper::new(settings.page_timeout);

    let composer = composer(settings)?;
    let social = open_social(settings, &options).await;
    let mut outreach = Outreach::new(composer, social, &sink, &resume);

    let sweep = Sweep::new(
        &settings.search,
        settings.discovery,
        settings.pacing,
        Discovery::new(&scraper, &apis, &sink, settings.pacing),
        ApplicationDriver::new(&sink, SITE_DOMAIN, settings.page_timeout),
        &sink,
    )
    .until(shutdown);

    let result = async {
        auth::authenticate(&mut session, &settings.site, settings.page_timeout).await?;
        let mut store = AppliedStore::load(settings.state_dir.join(APPLIED_JOBS_FILE))?;
        tracing::info!(path = %store.path().display(), "{} links already applied", store.len());
        Ok::<_, AgentError>(sweep.run(&mut session, &mut store, &mut outreach).await)
    }
    .await;

    outreach.close().await;
    if let Err(e) = session.close().await {
        tracing::warn!("Closing browsing session failed: {e}");
    }

    let summary = result?;
    tracing::info!(
        discovered = summary.discovered,
        attempted = summary.attempted,
        applied = summary.applied,
        external = summary.external,
        failed = summary.failed,
        messaged = summary.messaged,
        "Sweep complete"
    );
    Ok(summary)
}

/// Discovery plus the per-job pipeline for one sweep.
pub struct Sweep<'a> {
    search: &'a SearchConfig,
    mode: DiscoveryMode,
    pacing: Pacing,
    discovery: Discovery<'a>,
    driver: ApplicationDriver<'a>,
    sink: &'a dyn EventSink,
    shutdown: watch::Receiver<bool>,
}

impl<'a> Sweep<'a> {
    pub fn new(
        search: &'a SearchConfig,
        mode: DiscoveryMode,
        pacing: Pacing,
        discovery: Discovery<'a>,
        driver: ApplicationDriver<'a>,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            search,
            mode,
            pacing,
            discovery,
            driver,
            sink,
            shutdown: watch::channel(false).1,
        }
    }

    /// Stop before the next job once `shutdown` turns true.
    pub fn until(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Discover, drop links already applied to, shuffle, then process each
    /// job serially. A failing job is logged and skipped.
    pub async fn run(
        &self,
        session: &mut dyn BrowsingSession,
        store: &mut AppliedStore,
        outreach: &mut Outreach<'_>,
    ) -> SweepSummary {
        let found = self.discovery.discover(session, self.search, self.mode).await;
        let mut summary = SweepSummary {
            discovered: found.len(),
            ..Default::default()
        };

        let mut fresh: Vec<_> = found.into_iter().filter(|job| !store.contains(&job.link)).collect();
        tracing::info!(
            "Found {} jobs; {} new after skipping {} previously applied",
            summary.discovered,
            fresh.len(),
            store.len()
        );
        fresh.shuffle(&mut rand::rng());

        for job in &fresh {
            if *self.shutdown.borrow() {
                tracing::info!("Shutdown requested, ending sweep early");
                break;
            }
            summary.attempted += 1;
            tracing::info!(title = %job.title, company = %job.company, source = %job.source, "Processing");

            match self.driver.process(session, job).await {
                Ok(report) if report.applied() => {
                    summary.applied += 1;
                    if matches!(report.outcome, ApplyOutcome::AppliedExternal { .. }) {
                        summary.external += 1;
                    }

                    let delivery = outreach.follow_up(session, job, &report).await;
                    tracing::debug!(?delivery, "Outreach finished");
                    if delivery.delivered() {
                        summary.messaged += 1;
                    }

                    if let Err(e) = store.insert(&job.link) {
                        tracing::error!(link = %job.link, "Failed to persist applied link: {e}");
                    }
                    best_effort("applied", self.sink.record_applied(job));
                }
                Ok(_) => {}
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(link = %job.link, "Job failed, skipping: {e}");
                }
            }

            self.pacing.pause().await;
        }

        summary
    }
}
