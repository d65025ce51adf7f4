//! HTTP transport for listing API calls
//!
//! [`ApiTransport`] is the seam the orchestrator sends through; the
//! [`ReqwestTransport`] implementation shares one pooled client across all
//! requests of a run.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::settings::HttpSettings;
use crate::session::cookie_header;
use crate::{Error, Result};

/// Ordered request headers; names are lowercase wire names.
pub type HeaderList = Vec<(&'static str, String)>;

/// Status and raw body of an API response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends a GET with explicit headers and a cookie snapshot.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderList,
        cookies: &BTreeMap<String, String>,
    ) -> Result<ApiResponse>;
}

/// Build the shared HTTP client from settings.
pub fn build_http_client(settings: &HttpSettings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout());

    if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.is_empty()) {
        debug!("Using proxy {}", proxy);
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}

/// Header set the site's own search page sends with API calls.
pub fn api_headers(
    user_agent: &str,
    page_name: &str,
    api_token: &str,
    authorization_token: &str,
    referer: &str,
) -> HeaderList {
    vec![
        ("accept", "*/*".to_string()),
        ("accept-language", "en-US,en;q=0.9".to_string()),
        ("apitoken", api_token.to_string()),
        ("authorizationtoken", authorization_token.to_string()),
        ("cache-control", "no-cache".to_string()),
        ("dnt", "1".to_string()),
        ("pagename", page_name.to_string()),
        ("platform", "desktop".to_string()),
        ("pragma", "no-cache".to_string()),
        ("priority", "u=1, i".to_string()),
        ("referer", referer.to_string()),
        (
            "sec-ch-ua",
            r#""Chromium";v="133", "Not(A:Brand";v="99""#.to_string(),
        ),
        ("sec-ch-ua-mobile", "?0".to_string()),
        ("sec-ch-ua-platform", r#""Windows""#.to_string()),
        ("sec-fetch-dest", "empty".to_string()),
        ("sec-fetch-mode", "cors".to_string()),
        ("sec-fetch-site", "same-origin".to_string()),
        ("user-agent", user_agent.to_string()),
    ]
}

/// [`ApiTransport`] over a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApiTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderList,
        cookies: &BTreeMap<String, String>,
    ) -> Result<ApiResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        if !cookies.is_empty() {
            request = request.header(reqwest::header::COOKIE, cookie_header(cookies));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::rate_limited(url));
        }
        if status != StatusCode::OK {
            return Err(Error::network(
                Some(status.as_u16()),
                format!("unexpected status from {}", url),
            ));
        }

        let body = response.text().await?;
        Ok(ApiResponse::new(status.as_u16(), body))
    }
}
