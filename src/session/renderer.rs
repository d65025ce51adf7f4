//! Page rendering collaborator
//!
//! The bootstrap needs two things from the site: the page markup (which embeds
//! the bootstrap token and encrypted input) and the cookies issued by the
//! background login call the page makes while loading. [`PageRenderer`] is the
//! seam; [`HttpPageRenderer`] is a plain-HTTP implementation that fetches the
//! document and replays the login call itself.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use url::Url;

use crate::{Error, Result};

/// Markup and cookies captured from a single render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// Rendered document source
    pub markup: String,
    /// Cookies set by the authentication call; empty when it was never observed
    pub cookies: BTreeMap<String, String>,
}

impl RenderedPage {
    pub fn new(markup: impl Into<String>, cookies: BTreeMap<String, String>) -> Self {
        Self {
            markup: markup.into(),
            cookies,
        }
    }
}

/// Renders a URL and captures its authentication cookies.
///
/// Capture state belongs to the returned value; implementations keep nothing
/// between calls.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_and_capture(&self, url: &str) -> Result<RenderedPage>;
}

/// Fetches page markup over HTTP and replays the page's login call to collect
/// the session cookies.
#[derive(Debug, Clone)]
pub struct HttpPageRenderer {
    client: Client,
    auth_path: String,
}

impl HttpPageRenderer {
    pub fn new(client: Client, auth_path: impl Into<String>) -> Self {
        Self {
            client,
            auth_path: auth_path.into(),
        }
    }

    /// Login endpoint on the same origin as `page_url`.
    pub fn auth_url(&self, page_url: &str) -> Result<Url> {
        Ok(Url::parse(page_url)?.join(&self.auth_path)?)
    }

    async fn fetch_markup(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header("sec-fetch-dest", "document")
            .header("sec-fetch-mode", "navigate")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(
                Some(status.as_u16()),
                format!("page request failed for {}", url),
            ));
        }

        Ok(response.text().await?)
    }

    /// Cookies from the login call, or `None` if the call failed or set nothing.
    async fn capture_auth_cookies(&self, page_url: &str) -> Option<BTreeMap<String, String>> {
        let auth_url = match self.auth_url(page_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot build auth URL for {}: {}", page_url, e);
                return None;
            }
        };

        let response = match self
            .client
            .get(auth_url.clone())
            .header(ACCEPT, "*/*")
            .header(REFERER, page_url)
            .header("sec-fetch-mode", "cors")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Auth call to {} failed: {}", auth_url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                status = response.status().as_u16(),
                "Auth call to {} was rejected", auth_url
            );
            return None;
        }

        let cookies: BTreeMap<String, String> = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();

        if cookies.is_empty() {
            debug!("Auth call to {} set no cookies", auth_url);
            None
        } else {
            Some(cookies)
        }
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render_and_capture(&self, url: &str) -> Result<RenderedPage> {
        info!("Rendering {}", url);
        let markup = self.fetch_markup(url).await?;

        match self.capture_auth_cookies(url).await {
            Some(cookies) => {
                info!(count = cookies.len(), "Captured auth cookies");
                Ok(RenderedPage::new(markup, cookies))
            }
            None => {
                warn!("No auth response observed for {}, returning page source only", url);
                Ok(RenderedPage::new(markup, BTreeMap::new()))
            }
        }
    }
}
