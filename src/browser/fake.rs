//! Scripted in-memory session for tests. Pages are plain markup keyed by URL;
//! clicks resolve the same way `HttpSession` resolves them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::browser::{BrowsingSession, ClickAction, ElementHandle, Locator, Lookup, document, form_action};
use crate::error::AgentError;

#[derive(Default)]
pub struct FakeSession {
    pages: HashMap<String, String>,
    timeouts: HashMap<String, usize>,
    unreachable: HashSet<String>,
    fill_log: Option<Arc<Mutex<Vec<(String, String)>>>>,
    current: Option<String>,
    new_context: Option<String>,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub fills: Vec<(String, String)>,
    pub submissions: Vec<(String, Vec<(String, String)>)>,
    pub closed: bool,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Make the next `times` navigations to `url` time out.
    pub fn timing_out(mut self, url: &str, times: usize) -> Self {
        self.timeouts.insert(url.to_string(), times);
        self
    }

    /// Make every navigation to `url` fail outright.
    pub fn failing(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Mirror every fill into `log`, for sessions that end up boxed.
    pub fn sharing_fills(mut self, log: Arc<Mutex<Vec<(String, String)>>>) -> Self {
        self.fill_log = Some(log);
        self
    }

    fn html(&self) -> &str {
        self.current
            .as_ref()
            .and_then(|u| self.pages.get(u))
            .map(String::as_str)
            .unwrap_or("<html><body></body></html>")
    }

    async fn perform(&mut self, action: ClickAction) -> Result<(), AgentError> {
        match action {
            ClickAction::Follow(url) => self.navigate(url.as_str()).await,
            ClickAction::OpenContext(url) => {
                self.new_context = Some(url.to_string());
                Ok(())
            }
            ClickAction::Submit { url, fields, .. } => {
                let fields = fields
                    .into_iter()
                    .map(|(name, value)| {
                        let filled = self.fills.iter().rev().find(|(n, _)| *n == name);
                        let value = filled.map(|(_, v)| v.clone()).unwrap_or(value);
                        (name, value)
                    })
                    .collect();
                self.submissions.push((url.to_string(), fields));
                self.navigate(url.as_str()).await
            }
            ClickAction::Inert => Ok(()),
        }
    }

    fn base(&self) -> Result<Url, AgentError> {
        let current = self
            .current
            .as_deref()
            .ok_or_else(|| AgentError::ElementNotFound("no page loaded".into()))?;
        Ok(Url::parse(current)?)
    }
}

#[async_trait]
impl BrowsingSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AgentError> {
        self.navigations.push(url.to_string());
        if self.unreachable.contains(url) {
            return Err(AgentError::JobProcessing(format!("connection refused: {url}")));
        }
        if let Some(left) = self.timeouts.get_mut(url)
            && *left > 0
        {
            *left -= 1;
            return Err(AgentError::NavigationTimeout(url.to_string()));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_quiescence(&mut self, _timeout: Duration) -> Lookup<()> {
        Lookup::Found(())
    }

    async fn find_element(&mut self, locator: &Locator) -> Lookup<ElementHandle> {
        match document::find(self.html(), locator) {
            Some(el) => Lookup::Found(el),
            None => Lookup::NotFound,
        }
    }

    async fn wait_for(&mut self, locator: &Locator, _timeout: Duration) -> Lookup<ElementHandle> {
        match self.find_element(locator).await {
            Lookup::Found(el) => Lookup::Found(el),
            _ => Lookup::TimedOut,
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), AgentError> {
        self.clicks.push(element.text.clone());
        let action = element.click_action(&self.base()?);
        self.perform(action).await
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), AgentError> {
        if !element.enabled {
            return Err(AgentError::ElementNotFound("disabled".into()));
        }
        let name = element.field_name().unwrap_or(element.tag.as_str());
        self.fills.push((name.to_string(), text.to_string()));
        if let Some(log) = &self.fill_log {
            log.lock().unwrap().push((name.to_string(), text.to_string()));
        }
        Ok(())
    }

    async fn submit(&mut self, element: &ElementHandle) -> Result<(), AgentError> {
        let form = element
            .form
            .clone()
            .ok_or_else(|| AgentError::ElementNotFound("no enclosing form".into()))?;
        let action = form_action(&form, &self.base()?);
        self.perform(action).await
    }

    fn current_url(&self) -> Option<String> {
        self.current.clone()
    }

    async fn content(&mut self) -> Result<String, AgentError> {
        Ok(self.html().to_string())
    }

    async fn take_new_context(&mut self) -> Option<String> {
        self.new_context.take()
    }

    async fn close(&mut self) -> Result<(), AgentError> {
        self.closed = true;
        Ok(())
    }
}
