//! Session bootstrap
//!
//! Renders a search page, pulls the bootstrap token and encrypted input out of
//! its markup and pairs them with the cookies captured during the render. The
//! whole attempt is retried under an injected [`RetryPolicy`].

use rand::Rng;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::context::SessionContext;
use super::renderer::PageRenderer;
use crate::config::settings::SessionSettings;
use crate::{Error, Result};

static API_TOKEN_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"__apiToken" value="([^"]+)""#).expect("api token marker regex")
});

static ENCRYPTED_INPUT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""encrypted_input":"([^"]+)""#).expect("encrypted input marker regex")
});

/// Bootstrap token embedded in the page as a hidden `__apiToken` input
pub fn extract_api_token(markup: &str) -> Option<String> {
    API_TOKEN_MARKER
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Encrypted input embedded in the page's inline state JSON
pub fn extract_encrypted_input(markup: &str) -> Option<String> {
    ENCRYPTED_INPUT_MARKER
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Attempt count and pacing for bootstrap retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// Retry without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Add up to `jitter` of random extra delay per wait.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn from_settings(settings: &SessionSettings) -> Self {
        Self::new(settings.max_attempts, settings.retry_delay()).with_jitter(settings.retry_jitter())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next attempt, including jitter.
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let max_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        self.delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, Duration::from_secs(30))
    }
}

/// Obtains a [`SessionContext`] for a search page.
#[derive(Clone)]
pub struct SessionBootstrap {
    renderer: Arc<dyn PageRenderer>,
    policy: RetryPolicy,
}

impl SessionBootstrap {
    pub fn new(renderer: Arc<dyn PageRenderer>, policy: RetryPolicy) -> Self {
        Self { renderer, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Render `page_url` until a complete context is captured or the policy's
    /// attempts run out. No delay follows the final attempt.
    ///
    /// Setting `interrupt` cuts the wait between attempts short and stops
    /// further attempts.
    pub async fn bootstrap(
        &self,
        page_url: &str,
        interrupt: &AtomicBool,
    ) -> Result<SessionContext> {
        let max_attempts = self.policy.max_attempts();
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && interrupt.load(Ordering::SeqCst) {
                warn!(url = page_url, attempt, "Interrupted, not retrying bootstrap");
                return Err(Error::bootstrap(
                    page_url,
                    format!("interrupted after {} attempt(s)", attempt - 1),
                ));
            }
            debug!(url = page_url, attempt, max_attempts, "Bootstrap attempt");

            match self.attempt(page_url).await {
                Ok(context) => {
                    info!(url = page_url, attempt, "Session bootstrapped");
                    return Ok(context);
                }
                Err(e) => {
                    warn!(
                        url = page_url,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Bootstrap attempt failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.next_delay();
                if !delay.is_zero() {
                    info!("Waiting {:?} before retrying bootstrap", delay);
                    // race the wait against the interrupt flag so Ctrl-C ends it
                    tokio::select! {
                        biased;
                        () = async {
                            while !interrupt.load(Ordering::SeqCst) {
                                tokio::time::sleep(Duration::from_millis(50)).await;
                            }
                        } => {}
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!("gave up after {} attempt(s): {}", max_attempts, e),
            None => format!("gave up after {} attempt(s)", max_attempts),
        };
        Err(Error::bootstrap(page_url, reason))
    }

    async fn attempt(&self, page_url: &str) -> Result<SessionContext> {
        let page = self.renderer.render_and_capture(page_url).await?;

        let token = extract_api_token(&page.markup)
            .ok_or_else(|| Error::bootstrap(page_url, "__apiToken marker not found in markup"))?;
        let encrypted_input = extract_encrypted_input(&page.markup).ok_or_else(|| {
            Error::bootstrap(page_url, "encrypted_input marker not found in markup")
        })?;

        SessionContext::new(token, encrypted_input, page.cookies)
            .map_err(|e| Error::bootstrap(page_url, e.to_string()))
    }
}

impl std::fmt::Debug for SessionBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBootstrap")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
