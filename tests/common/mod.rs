//! Common test utilities and helpers
//!
//! Scripted collaborators and fixtures shared by the integration suites.

#![allow(dead_code)]

use acres_scout::fetch::{
    ApiResponse, ApiTransport, FetchConfig, FetchOrchestrator, HeaderList, RateLimiter,
};
use acres_scout::session::{PageRenderer, RenderedPage, RetryPolicy, SessionBootstrap};
use acres_scout::token::crypto::base64_url_encode;
use acres_scout::token::{SecretMaterial, TokenGenerator};
use acres_scout::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const SALT1: &str = "saltA";
pub const SALT2: &str = "saltB";
pub const SECRET: &[u8] = b"secretkey";
pub const SEARCH_URL: &str = "https://www.example.com/search/property/rent/pune?city=19";

/// Standard base64 of the fixture secret, as it appears in `s3`
pub fn secret_b64() -> String {
    base64::engine::general_purpose::STANDARD.encode(SECRET)
}

/// A bootstrap token carrying the fixture salts and secret, issued at a fixed time
pub fn bootstrap_token() -> String {
    let issued_at = chrono::DateTime::from_timestamp_millis(1_718_000_000_000).unwrap();
    TokenGenerator::default()
        .generate_at(
            &SecretMaterial::new(SALT1, SALT2, secret_b64()),
            "",
            "",
            issued_at,
        )
        .unwrap()
        .to_string()
}

/// Token-shaped string whose payload is arbitrary JSON
pub fn token_with_payload(payload: &Value) -> String {
    format!(
        "{}.{}.{}",
        base64_url_encode(br#"{"typ":"JWT","alg":"HS256"}"#),
        base64_url_encode(payload.to_string().as_bytes()),
        base64_url_encode(b"sig")
    )
}

/// Search page markup embedding a token and encrypted input
pub fn page_markup(token: &str, encrypted_input: &str) -> String {
    format!(
        r#"<html><body><form><input type="hidden" id="__apiToken" value="{token}"/></form>
<script>window.__initialData__ = {{"srpData":{{"encrypted_input":"{encrypted_input}","page":1}}}};</script>
</body></html>"#
    )
}

/// Interrupt flag that is never raised
pub fn not_interrupted() -> AtomicBool {
    AtomicBool::new(false)
}

pub fn session_cookies() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("GOOGLE_SEARCH_ID".to_string(), "g1".to_string()),
        ("PHPSESSID".to_string(), "sess1".to_string()),
    ])
}

/// A complete render result
pub fn good_page() -> RenderedPage {
    RenderedPage::new(page_markup(&bootstrap_token(), "ENC=="), session_cookies())
}

/// Renderer that replays a script of outcomes, repeating the last one.
///
/// `None` entries fail the render.
pub struct ScriptedRenderer {
    script: Mutex<VecDeque<Option<RenderedPage>>>,
    last: Mutex<Option<RenderedPage>>,
    calls: AtomicUsize,
}

impl ScriptedRenderer {
    pub fn new(script: Vec<Option<RenderedPage>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always(page: RenderedPage) -> Arc<Self> {
        Self::new(vec![Some(page)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render_and_capture(&self, url: &str) -> Result<RenderedPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = outcome.clone();
                outcome
            }
            None => self.last.lock().unwrap().clone(),
        };
        outcome.ok_or_else(|| Error::network(None, format!("render failed for {}", url)))
    }
}

/// One request seen by [`ScriptedTransport`]
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub url: String,
    pub page: u32,
    pub headers: HashMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

impl SeenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

type Responder = dyn Fn(u32, usize) -> Result<ApiResponse> + Send + Sync;

/// Transport answering by `(page, attempt for that page)`, attempts counted from 1.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    attempts: Mutex<HashMap<u32, usize>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(u32, usize) -> Result<ApiResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            attempts: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.seen().iter().map(|r| r.page).collect();
        pages.sort_unstable();
        pages
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn get(
        &self,
        url: &str,
        headers: &HeaderList,
        cookies: &BTreeMap<String, String>,
    ) -> Result<ApiResponse> {
        let page: u32 = Url::parse(url)?
            .query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
            .unwrap_or(0);

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let entry = attempts.entry(page).or_insert(0);
            *entry += 1;
            *entry
        };

        self.seen.lock().unwrap().push(SeenRequest {
            url: url.to_string(),
            page,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            cookies: cookies.clone(),
        });

        (self.responder)(page, attempt)
    }
}

/// SRP body with `count` listings `"{page}-{i}"` and an advertised total
pub fn srp_page(page: u32, count: usize, total: Option<u64>) -> ApiResponse {
    let properties: Vec<Value> = (0..count)
        .map(|i| json!({"PROP_ID": format!("{page}-{i}"), "PROPERTY_TYPE": "Flat"}))
        .collect();
    let mut body = json!({ "properties": properties });
    if let Some(total) = total {
        body["count"] = json!(total);
    }
    ApiResponse::new(200, body.to_string())
}

pub fn fetch_config(batch_size: u32, max_pages: u32) -> FetchConfig {
    FetchConfig {
        base_url: Url::parse("https://www.example.com").unwrap(),
        batch_size,
        page_size: 25,
        max_pages,
        user_agent: "acres-scout-tests/1.0".to_string(),
    }
}

/// Orchestrator over scripted collaborators with no waits
pub fn orchestrator(
    renderer: Arc<ScriptedRenderer>,
    transport: Arc<ScriptedTransport>,
    config: FetchConfig,
) -> FetchOrchestrator {
    FetchOrchestrator::new(
        SessionBootstrap::new(renderer, RetryPolicy::immediate(2)),
        transport,
        Arc::new(RateLimiter::new(1000, Duration::from_millis(1))),
        config,
    )
}
