use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use url::Url;

use crate::browser::{BrowsingSession, ClickAction, ElementHandle, Locator, Lookup, document, form_action};
use crate::error::AgentError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub page_timeout: Duration,
}

struct Page {
    url: Url,
    html: String,
}

/// Browsing session over plain HTTP with a cookie jar.
///
/// Pages arrive fully rendered, anchors are followed, form controls submit
/// their form with whatever was filled in, and script-only controls accept
/// the click without effect.
pub struct HttpSession {
    client: reqwest::Client,
    page: Option<Page>,
    filled: HashMap<String, String>,
    new_context: Option<String>,
}

impl HttpSession {
    pub fn new(options: &SessionOptions) -> Result<Self, AgentError> {
        if !options.headless {
            tracing::debug!("HTTP sessions have no window; running headless regardless");
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-IN,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .timeout(options.page_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            page: None,
            filled: HashMap::new(),
            new_context: None,
        })
    }

    async fn load(&mut self, request: reqwest::RequestBuilder, label: &str) -> Result<(), AgentError> {
        let resp = request
            .send()
            .await
            .map_err(|e| AgentError::from_transport(label, e))?;

        let status = resp.status();
        let url = resp.url().clone();
        let html = resp
            .text()
            .await
            .map_err(|e| AgentError::from_transport(label, e))?;

        if !status.is_success() {
            tracing::warn!(%status, url = %url, "page returned error status");
        }

        self.page = Some(Page { url, html });
        self.filled.clear();
        Ok(())
    }

    async fn perform(&mut self, action: ClickAction) -> Result<(), AgentError> {
        match action {
            ClickAction::Follow(url) => {
                let label = url.to_string();
                let request = self.client.get(url);
                self.load(request, &label).await
            }
            ClickAction::OpenContext(url) => {
                self.new_context = Some(url.to_string());
                Ok(())
            }
            ClickAction::Submit { url, method, fields } => {
                let mut pairs: Vec<(String, String)> = fields
                    .into_iter()
                    .map(|(name, value)| {
                        let value = self.filled.remove(&name).unwrap_or(value);
                        (name, value)
                    })
                    .collect();
                pairs.extend(self.filled.drain());

                let label = url.to_string();
                let request = if method == "post" {
                    self.client.post(url).form(&pairs)
                } else {
                    self.client.get(url).query(&pairs)
                };
                self.load(request, &label).await
            }
            ClickAction::Inert => Ok(()),
        }
    }

    fn page_url(&self) -> Result<Url, AgentError> {
        self.page
            .as_ref()
            .map(|p| p.url.clone())
            .ok_or_else(|| AgentError::ElementNotFound("no page loaded".to_string()))
    }
}

#[async_trait]
impl BrowsingSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AgentError> {
        let target = Url::parse(url)?;
        let request = self.client.get(target);
        self.load(request, url).await
    }

    async fn wait_for_quiescence(&mut self, _timeout: Duration) -> Lookup<()> {
        match self.page {
            Some(_) => Lookup::Found(()),
            None => Lookup::NotFound,
        }
    }

    async fn find_element(&mut self, locator: &Locator) -> Lookup<ElementHandle> {
        let Some(page) = &self.page else {
            return Lookup::NotFound;
        };
        match document::find(&page.html, locator) {
            Some(el) => Lookup::Found(el),
            None => Lookup::NotFound,
        }
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), AgentError> {
        let base = self.page_url()?;
        let action = element.click_action(&base);
        self.perform(action).await
    }

    async fn fill(&mut self, element: &ElementHandle, text: &str) -> Result<(), AgentError> {
        if !element.enabled {
            return Err(AgentError::ElementNotFound(format!("<{}> is disabled", element.tag)));
        }
        let name = element
            .field_name()
            .ok_or_else(|| AgentError::ElementNotFound(format!("<{}> has no name", element.tag)))?;
        self.filled.insert(name.to_string(), text.to_string());
        Ok(())
    }

    async fn submit(&mut self, element: &ElementHandle) -> Result<(), AgentError> {
        let base = self.page_url()?;
        let form = element
            .form
            .as_ref()
            .ok_or_else(|| AgentError::ElementNotFound("no enclosing form to submit".to_string()))?;
        self.perform(form_action(form, &base)).await
    }

    fn current_url(&self) -> Option<String> {
        self.page.as_ref().map(|p| p.url.to_string())
    }

    async fn content(&mut self) -> Result<String, AgentError> {
        Ok(self.page.as_ref().map(|p| p.html.clone()).unwrap_or_default())
    }

    async fn take_new_context(&mut self) -> Option<String> {
        self.new_context.take()
    }

    async fn close(&mut self) -> Result<(), AgentError> {
        self.page = None;
        self.filled.clear();
        self.new_context = None;
        Ok(())
    }
}
