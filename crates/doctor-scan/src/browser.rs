use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::page::Page;
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::scan_types::{NetworkLogEntry, ScanError};

/// CDP method name attached to every captured response event.
pub const RESPONSE_RECEIVED_METHOD: &str = "Network.responseReceived";

/// CSS selector of the interstitial the site serves to suspected bots.
const CHALLENGE_SELECTOR: &str = "form#challenge-form";

/// Configuration for the scraping browser session.
#[derive(Debug, Clone)]
pub struct BrowserSessionConfig {
    /// How long to let the page settle after navigation and after scrolling.
    pub settle_time: Duration,

    /// User agents to rotate through.
    pub user_agents: Vec<String>,
}

impl Default for BrowserSessionConfig {
    fn default() -> Self {
        Self {
            settle_time: Duration::from_secs(5),
            user_agents: vec![
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36".to_string(),
            ],
        }
    }
}

/// A scoped Chromium session.
///
/// Acquired at cycle start and released before the inter-cycle countdown, on
/// both the success path and the bot-detection path. Runs headed: the site's
/// bot detection flags headless sessions far more aggressively.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    collector_task: JoinHandle<()>,
    log: Arc<Mutex<Vec<NetworkLogEntry>>>,
    config: BrowserSessionConfig,
}

impl BrowserSession {
    /// Launch Chromium with a randomized user agent and start capturing
    /// network response events.
    pub async fn launch(config: BrowserSessionConfig) -> Result<Self, ScanError> {
        let user_agent = pick_user_agent(&config.user_agents);
        debug!("Using user agent: {}", user_agent);

        let browser_config = BrowserConfig::builder()
            .with_head()
            .build()
            .map_err(ScanError::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScanError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScanError::Browser(format!("Failed to open page: {}", e)))?;

        let override_params = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .build()
            .map_err(ScanError::Browser)?;
        page.execute(override_params)
            .await
            .map_err(|e| ScanError::Browser(format!("Failed to set user agent: {}", e)))?;

        page.execute(EnableParams::default())
            .await
            .map_err(|e| ScanError::Browser(format!("Failed to enable network events: {}", e)))?;

        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| ScanError::Browser(format!("Failed to subscribe to responses: {}", e)))?;

        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let collector_task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                sink.lock().await.push(NetworkLogEntry {
                    method: RESPONSE_RECEIVED_METHOD.to_string(),
                    mime_type: event.response.mime_type.clone(),
                    url: event.response.url.clone(),
                });
            }
        });

        Ok(Self {
            browser,
            page,
            handler_task,
            collector_task,
            log,
            config,
        })
    }

    /// Navigate to the search page and return the network log accumulated
    /// during load.
    ///
    /// Waits for async content after navigation, scrolls to the bottom to
    /// trigger lazy-loaded results, then waits again. Returns
    /// [`ScanError::BotDetected`] when the page served a challenge form
    /// instead of results.
    pub async fn capture_search_logs(&self, url: &str) -> Result<Vec<NetworkLogEntry>, ScanError> {
        info!("Navigating to {}", url);
        self.page
            .goto(url)
            .await
            .map_err(|e| ScanError::Browser(format!("Navigation failed: {}", e)))?;

        sleep(self.config.settle_time).await;

        if self.has_bot_challenge().await {
            return Err(ScanError::BotDetected);
        }

        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(|e| ScanError::Browser(format!("Scroll failed: {}", e)))?;

        sleep(self.config.settle_time).await;

        let entries = self.log.lock().await.clone();
        debug!("Captured {} network log entries", entries.len());
        Ok(entries)
    }

    /// Best-effort display-name lookup for a provider, keyed by the
    /// `search-result-<id>` container the results page renders.
    pub async fn provider_name(&self, provider_id: &str) -> Option<String> {
        let selector = format!("div#search-result-{} h3", provider_id);

        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => {
                error!("Doctor's name not found!");
                return None;
            }
        };

        match element.inner_text().await {
            Ok(Some(name)) => Some(name.trim().to_string()),
            Ok(None) => {
                error!("Doctor's name not found!");
                None
            }
            Err(e) => {
                error!("Doctor's name lookup failed: {}", e);
                None
            }
        }
    }

    async fn has_bot_challenge(&self) -> bool {
        self.page.find_element(CHALLENGE_SELECTOR).await.is_ok()
    }

    /// Quit the browser and stop the background tasks.
    pub async fn close(mut self) {
        self.collector_task.abort();

        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Browser process did not exit cleanly: {}", e);
        }

        self.handler_task.abort();
    }
}

fn pick_user_agent(pool: &[String]) -> String {
    use rand::seq::IndexedRandom;

    let mut rng = rand::rng();
    pool.choose(&mut rng)
        .cloned()
        .unwrap_or_else(|| BrowserSessionConfig::default().user_agents[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_user_agent_from_pool() {
        let pool = vec!["agent-a".to_string(), "agent-b".to_string()];
        let picked = pick_user_agent(&pool);
        assert!(pool.contains(&picked));
    }

    #[test]
    fn test_pick_user_agent_empty_pool_falls_back() {
        let picked = pick_user_agent(&[]);
        assert!(picked.contains("Mozilla/5.0"));
    }
}
