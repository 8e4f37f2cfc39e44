use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::Local;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::browser::RESPONSE_RECEIVED_METHOD;
use crate::scan_types::{BlockedProviders, NetworkLogEntry, ProviderRecord, ScanError};

/// Substring that marks a devtools response as a search-result payload.
const SEARCH_RESULTS_MARKER: &str = "search_results";

/// Base endpoint for per-provider availability lookups.
const AVAILABILITIES_URL: &str = "https://www.doctolib.fr/availabilities.json";

/// Result cap requested from the availability endpoint.
const RESULT_LIMIT: u32 = 15;

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern is valid"));

/// One search-result JSON payload as served by the site.
#[derive(Debug, Deserialize)]
struct SearchResultResponse {
    search_result: Option<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    visit_motive_id: Option<i64>,
    #[serde(default)]
    agenda_ids: Vec<i64>,
    #[serde(default)]
    practice_ids: Vec<i64>,
}

/// True iff the entry is an actual JSON response carrying search results.
pub fn is_search_results_response(entry: &NetworkLogEntry) -> bool {
    entry.method == RESPONSE_RECEIVED_METHOD
        && entry.mime_type.contains("json")
        && entry.url.contains(SEARCH_RESULTS_MARKER)
}

/// First run of digits in the response URL, which the site uses as the
/// doctor id. `None` when the URL carries no digits at all.
pub fn extract_provider_id(url: &str) -> Option<String> {
    DIGITS.find(url).map(|m| m.as_str().to_string())
}

/// Everything the extractor learned from one cycle's network log.
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Providers ready for an availability lookup, in discovery order.
    pub providers: Vec<ProviderRecord>,
    /// Ids whose payload lacked `visit_motive_id`.
    pub invalid_ids: Vec<String>,
}

/// Turns captured network logs into provider records.
pub struct Extractor {
    client: Client,
    blocked: BlockedProviders,
    throttle: Duration,
}

impl Extractor {
    /// Create an extractor using the given HTTP client and blocked-id list.
    pub fn new(client: Client, blocked: BlockedProviders) -> Self {
        Self {
            client,
            blocked,
            // courtesy pause between payload fetches, trying to avoid blocking
            throttle: Duration::from_secs(1),
        }
    }

    /// Process every relevant log entry into a [`ProviderRecord`].
    ///
    /// Blocked and duplicate ids are skipped before any HTTP request is
    /// issued. Providers whose payload lacks `visit_motive_id` are collected
    /// into one aggregated warning at the end of the pass.
    pub async fn collect_providers(
        &self,
        logs: &[NetworkLogEntry],
    ) -> Result<ExtractReport, ScanError> {
        let mut report = ExtractReport::default();
        let mut seen = HashSet::new();

        for entry in logs.iter().filter(|e| is_search_results_response(e)) {
            self.process_entry(entry, &mut seen, &mut report).await?;
            sleep(self.throttle).await;
        }

        if !report.invalid_ids.is_empty() {
            let mut sorted = report.invalid_ids.clone();
            sorted.sort();
            warn!(
                "The following IDs are invalid or are associated to doctors who do not take \
                 new appointments. Consider adding them to blocked_doctor_ids: {}",
                sorted.join(", ")
            );
        }

        Ok(report)
    }

    async fn process_entry(
        &self,
        entry: &NetworkLogEntry,
        seen: &mut HashSet<String>,
        report: &mut ExtractReport,
    ) -> Result<(), ScanError> {
        let Some(provider_id) = extract_provider_id(&entry.url) else {
            warn!("No doctor id found in response URL {}", entry.url);
            return Ok(());
        };

        if !seen.insert(provider_id.clone()) {
            debug!("Skipping duplicate doctor_id {}", provider_id);
            return Ok(());
        }

        if self.blocked.contains(&provider_id) {
            warn!("Skipping blocked doctor_id {}", provider_id);
            return Ok(());
        }

        debug!("resp_url: {}", entry.url);

        let data: SearchResultResponse = self
            .client
            .get(&entry.url)
            .send()
            .await
            .map_err(|e| ScanError::Api(format!("Search result request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ScanError::Api(format!("Failed to parse search result: {}", e)))?;

        let Some(result) = data.search_result else {
            return Err(ScanError::UnexpectedSchema(format!(
                "response for doctor {} has no search_result object",
                provider_id
            )));
        };

        let Some(visit_motive_id) = result.visit_motive_id else {
            warn!("Invalid data or doctor does not take new appointments");
            report.invalid_ids.push(provider_id);
            return Ok(());
        };

        let agenda_id = result.agenda_ids.first().copied().ok_or_else(|| {
            ScanError::UnexpectedSchema(format!("doctor {}: agenda_ids is empty", provider_id))
        })?;
        let practice_id = result.practice_ids.first().copied().ok_or_else(|| {
            ScanError::UnexpectedSchema(format!("doctor {}: practice_ids is empty", provider_id))
        })?;

        let availability_url = build_availability_url(visit_motive_id, agenda_id, practice_id);
        report.providers.push(ProviderRecord {
            provider_id,
            availability_url,
        });

        Ok(())
    }
}

fn build_availability_url(visit_motive_id: i64, agenda_id: i64, practice_id: i64) -> String {
    let start_date = Local::now().format("%Y-%m-%d");
    format!(
        "{}?start_date={}&visit_motive_ids={}&agenda_ids={}&practice_ids={}&limit={}",
        AVAILABILITIES_URL, start_date, visit_motive_id, agenda_id, practice_id, RESULT_LIMIT
    )
}
