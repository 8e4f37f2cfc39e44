use chrono::{NaiveDate, NaiveTime};

/// One decoded devtools network event captured during page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLogEntry {
    /// CDP method name, e.g. `Network.responseReceived`.
    pub method: String,
    /// Declared MIME type of the response.
    pub mime_type: String,
    /// URL the response was served from.
    pub url: String,
}

/// A provider discovered in the search results, ready for an availability
/// lookup.
#[derive(Debug, Clone)]
pub struct ProviderRecord {
    /// Numeric doctor identifier taken from the response URL.
    pub provider_id: String,
    /// Fully-built availability query URL for this provider.
    pub availability_url: String,
}

/// Doctor ids that must never be queried, read from `blocked_doctor_ids`.
///
/// Membership is substring containment against the raw config value, so a
/// comma-separated list works as well as a single id.
#[derive(Debug, Clone, Default)]
pub struct BlockedProviders(String);

impl BlockedProviders {
    /// Wrap the raw `blocked_doctor_ids` config value.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Whether the given id appears in the blocked list.
    pub fn contains(&self, provider_id: &str) -> bool {
        !provider_id.is_empty() && self.0.contains(provider_id)
    }
}

/// A single appointment slot, parsed from one upstream timestamp string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRecord {
    /// Calendar date of the slot.
    pub date: NaiveDate,
    /// Time of day, offset discarded.
    pub time: NaiveTime,
    /// Display name of the doctor, when the DOM lookup succeeded.
    pub provider: Option<String>,
}

impl SlotRecord {
    /// Date formatted for console output and alerts, e.g.
    /// `Sunday, June 01, 2025`.
    pub fn formatted_date(&self) -> String {
        self.date.format("%A, %B %d, %Y").to_string()
    }

    /// Time formatted as `HH:MM`.
    pub fn formatted_time(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

/// Custom error type for scan operations
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Browser/devtools failure.
    #[error("Browser error: {0}")]
    Browser(String),

    /// The page served a bot-detection challenge instead of results.
    #[error("Bot detection challenge encountered")]
    BotDetected,

    /// HTTP request or body decoding failure.
    #[error("API error: {0}")]
    Api(String),

    /// The upstream payload is missing a field the scraper relies on.
    #[error("Unexpected upstream schema: {0}")]
    UnexpectedSchema(String),

    /// A slot timestamp did not match the expected shape.
    #[error("Malformed slot timestamp: {0}")]
    SlotFormat(String),

    /// Email dispatch failure.
    #[error("Notification error: {0}")]
    Notification(#[from] notification_services::NotificationError),
}
