use std::collections::HashSet;

use crate::browser::BrowsingSession;
use crate::collectors::SearchApi;
use crate::collectors::naukri::SiteScraper;
use crate::config::{DiscoveryMode, SearchConfig};
use crate::models::event::SkipRecord;
use crate::models::job::JobCandidate;
use crate::pacing::Pacing;
use crate::store::{EventSink, best_effort};

/// Keep the first candidate for every distinct link.
pub fn dedupe(candidates: Vec<JobCandidate>) -> Vec<JobCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|job| seen.insert(job.link.clone()))
        .collect()
}

/// Selects and combines job sources for a sweep.
pub struct Discovery<'a> {
    scraper: &'a SiteScraper,
    apis: &'a [Box<dyn SearchApi>],
    sink: &'a dyn EventSink,
    pacing: Pacing,
}

impl<'a> Discovery<'a> {
    pub fn new(
        scraper: &'a SiteScraper,
        apis: &'a [Box<dyn SearchApi>],
        sink: &'a dyn EventSink,
        pacing: Pacing,
    ) -> Self {
        Self {
            scraper,
            apis,
            sink,
            pacing,
        }
    }

    /// Candidates for `search`, one per link. Failures of individual
    /// (role, location) pairs are logged and skipped.
    pub async fn discover(
        &self,
        session: &mut dyn BrowsingSession,
        search: &SearchConfig,
        mode: DiscoveryMode,
    ) -> Vec<JobCandidate> {
        let raw = match mode {
            DiscoveryMode::Scrape => self.scrape_all(session, search).await,
            DiscoveryMode::Api => {
                let found = self.query_apis(search).await;
                if found.is_empty() {
                    tracing::info!("Search APIs produced nothing, falling back to scraping");
                    self.scrape_all(session, search).await
                } else {
                    found
                }
            }
            DiscoveryMode::Hybrid => {
                let mut all = self.scrape_all(session, search).await;
                all.extend(self.query_apis(search).await);
                all
            }
        };

        let unique = dedupe(raw);
        let total = unique.len();
        let kept = self.filter_relevant(unique, search);
        tracing::info!(
            mode = ?mode,
            "Discovery kept {} of {total} unique postings",
            kept.len()
        );
        kept
    }

    async fn scrape_all(
        &self,
        session: &mut dyn BrowsingSession,
        search: &SearchConfig,
    ) -> Vec<JobCandidate> {
        let mut found = Vec::new();
        for (i, (role, location)) in pairs(search).enumerate() {
            if i > 0 {
                self.pacing.pause().await;
            }
            match self
                .scraper
                .scrape(session, role, location, &search.experience)
                .await
            {
                Ok(jobs) => found.extend(jobs),
                Err(e) => tracing::warn!(role, location, "Scrape failed, skipping: {e}"),
            }
        }
        found
    }

    async fn query_apis(&self, search: &SearchConfig) -> Vec<JobCandidate> {
        if self.apis.is_empty() {
            tracing::info!("No search API keys configured");
            return Vec::new();
        }

        let mut found = Vec::new();
        for api in self.apis {
            for (i, (role, location)) in pairs(search).enumerate() {
                if i > 0 {
                    self.pacing.pause().await;
                }
                match api.search(role, location, &search.experience).await {
                    Ok(jobs) => {
                        tracing::info!(api = api.name(), source = %api.source(), role, location, "{} results", jobs.len());
                        found.extend(jobs);
                    }
                    Err(e) => {
                        tracing::warn!(api = api.name(), role, location, "Search failed, skipping: {e}")
                    }
                }
            }
        }
        found
    }

    /// Drop scraped postings that match neither a role nor a keyword, writing
    /// one skip record each. API results pass through.
    fn filter_relevant(&self, candidates: Vec<JobCandidate>, search: &SearchConfig) -> Vec<JobCandidate> {
        candidates
            .into_iter()
            .filter(|job| {
                if job.source.is_structured() || job.matches(&search.roles, &search.keywords) {
                    tracing::debug!(title = %job.title, "Match");
                    return true;
                }
                tracing::info!(title = %job.title, "Skipped: no role or keyword match");
                best_effort("skip", self.sink.record_skipped(&SkipRecord::for_job(job)));
                false
            })
            .collect()
    }
}

fn pairs(search: &SearchConfig) -> impl Iterator<Item = (&str, &str)> {
    let locations: Vec<&str> = search
        .locations
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    search
        .roles
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .flat_map(move |role| locations.clone().into_iter().map(move |loc| (role, loc)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::browser::fake::FakeSession;
    use crate::error::AgentError;
    use crate::models::job::JobSource;
    use crate::store::memory::MemorySink;

    struct StubApi {
        jobs: Vec<JobCandidate>,
        calls: AtomicUsize,
    }

    impl StubApi {
        fn new(jobs: Vec<JobCandidate>) -> Self {
            Self {
                jobs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SearchApi for StubApi {
        fn name(&self) -> &str {
            "stub"
        }

        fn source(&self) -> JobSource {
            JobSource::Adzuna
        }

        async fn search(&self, _: &str, _: &str, _: &str) -> Result<Vec<JobCandidate>, AgentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.jobs.clone())
        }
    }

    fn search() -> SearchConfig {
        serde_json::from_str(
            r#"{"roles": ["Data Scientist"], "locations": ["Bangalore"], "experience": "2", "keywords": ["pytorch"]}"#,
        )
        .unwrap()
    }

    const RESULTS: &str = r#"
        <article class="jobTuple"><a class="title" href="/job-listings-ds-1">Data Scientist</a></article>
        <article class="jobTuple"><a class="title" href="/job-listings-ml-2">ML Engineer</a><p>PyTorch</p></article>
        <article class="jobTuple"><a class="title" href="/job-listings-cook-3">Line Cook</a><p>Kitchen</p></article>
        <article class="jobTuple"><a class="title" href="/job-listings-ds-1">Data Scientist (repost)</a></article>"#;

    fn session() -> FakeSession {
        FakeSession::new().page(&SiteScraper::search_url("Data Scientist", "Bangalore", "2"), RESULTS)
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let a = JobCandidate::new("A", "https://x/1", "", JobSource::Scrape);
        let b = JobCandidate::new("B", "https://x/1", "", JobSource::Adzuna);
        let c = JobCandidate::new("C", "https://x/2", "", JobSource::JSearch);
        let out = dedupe(vec![a.clone(), b, c.clone(), a.clone()]);
        assert_eq!(out, vec![a, c]);
    }

    #[test]
    fn pairs_are_the_cartesian_product() {
        let mut s = search();
        s.roles = vec!["A".into(), " ".into(), "B".into()];
        s.locations = vec!["X".into(), "Y".into()];
        let got: Vec<_> = pairs(&s).collect();
        assert_eq!(got, vec![("A", "X"), ("A", "Y"), ("B", "X"), ("B", "Y")]);
    }

    #[tokio::test]
    async fn scrape_mode_filters_and_logs_each_skip_once() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let apis: Vec<Box<dyn SearchApi>> = Vec::new();
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let jobs = discovery
            .discover(&mut session(), &search(), DiscoveryMode::Scrape)
            .await;
        let titles: Vec<_> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["Data Scientist", "ML Engineer"]);
        assert_eq!(sink.skipped_links(), vec!["https://www.naukri.com/job-listings-cook-3"]);
    }

    #[tokio::test]
    async fn api_mode_without_keys_falls_back_to_scrape() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let apis: Vec<Box<dyn SearchApi>> = Vec::new();
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let mut session = session();
        let jobs = discovery.discover(&mut session, &search(), DiscoveryMode::Api).await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(session.navigations.len(), 1);
    }

    #[tokio::test]
    async fn api_mode_with_empty_results_falls_back_to_scrape() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let apis: Vec<Box<dyn SearchApi>> = vec![Box::new(StubApi::new(Vec::new()))];
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let jobs = discovery.discover(&mut session(), &search(), DiscoveryMode::Api).await;
        assert_eq!(jobs.len(), 2);
    }

    #[tokio::test]
    async fn api_results_skip_the_keyword_filter_and_scraping() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let api_job = JobCandidate::new("Barista", "https://www.adzuna.in/land/1", "Cafe", JobSource::Adzuna);
        let apis: Vec<Box<dyn SearchApi>> = vec![Box::new(StubApi::new(vec![api_job.clone()]))];
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let mut session = session();
        let jobs = discovery.discover(&mut session, &search(), DiscoveryMode::Api).await;
        assert_eq!(jobs, vec![api_job]);
        assert!(session.navigations.is_empty());
        assert!(sink.skipped_links().is_empty());
    }

    #[tokio::test]
    async fn hybrid_concatenates_with_scrape_first() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let duplicate = JobCandidate::new(
            "Data Scientist via API",
            "https://www.naukri.com/job-listings-ds-1",
            "Acme",
            JobSource::JSearch,
        );
        let fresh = JobCandidate::new("Analyst", "https://boards.example.com/9", "Beta", JobSource::JSearch);
        let apis: Vec<Box<dyn SearchApi>> = vec![Box::new(StubApi::new(vec![duplicate, fresh.clone()]))];
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let jobs = discovery.discover(&mut session(), &search(), DiscoveryMode::Hybrid).await;
        assert_eq!(jobs.len(), 3);
        assert_eq!(jobs[0].source, JobSource::Scrape);
        assert_eq!(jobs[0].title, "Data Scientist");
        assert_eq!(jobs[2], fresh);
    }

    #[tokio::test]
    async fn failing_pair_does_not_abort_discovery() {
        let scraper = SiteScraper::new(Duration::ZERO);
        let sink = MemorySink::default();
        let apis: Vec<Box<dyn SearchApi>> = Vec::new();
        let discovery = Discovery::new(&scraper, &apis, &sink, Pacing::none());

        let mut s = search();
        s.locations = vec!["Pune".into(), "Bangalore".into()];
        let pune = SiteScraper::search_url("Data Scientist", "Pune", "2");
        let mut session = session().timing_out(&pune, 1);

        let jobs = discovery.discover(&mut session, &s, DiscoveryMode::Scrape).await;
        assert_eq!(session.navigations.len(), 2);
        assert_eq!(jobs.len(), 2);
    }
}
