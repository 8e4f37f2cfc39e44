use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::scan_types::{ScanError, SlotRecord};

/// Availability payload returned by the booking site for one provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityResponse {
    /// Number of slots the upstream buckets as near-term.
    pub total: i64,

    /// Day groupings, each carrying raw slot timestamps.
    #[serde(default)]
    pub availabilities: Vec<DayAvailability>,

    /// Earliest slot when `total` is zero. Often absent.
    #[serde(default)]
    pub next_slot: Option<String>,
}

/// One day grouping inside an availability payload.
#[derive(Debug, Clone, Deserialize)]
pub struct DayAvailability {
    /// Raw slot timestamps, `<date>T<time>` shaped.
    #[serde(default)]
    pub slots: Vec<String>,
}

/// Outcome of classifying one provider's availability payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotOutcome {
    /// `total > 0`: every near-term slot, parsed.
    Imminent(Vec<SlotRecord>),

    /// `total == 0` but the upstream reported an earliest slot.
    Faraway(SlotRecord),

    /// `total == 0` and no `next_slot` field. Not an error.
    NoSlots,

    /// `total > 0` with an empty `availabilities` list. The upstream has
    /// started serving degraded responses; the cycle stops querying the
    /// remaining providers.
    MissingSlots,
}

/// Client for the availability endpoint.
pub struct AvailabilityClient {
    client: Client,
}

impl AvailabilityClient {
    /// Create a client reusing the cycle's HTTP connection pool.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch and decode one provider's availability payload.
    pub async fn fetch(&self, url: &str) -> Result<AvailabilityResponse, ScanError> {
        debug!("Analyzing {}", url);

        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| ScanError::Api(format!("Availability request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| ScanError::Api(format!("Failed to parse availability response: {}", e)))
    }
}

/// Classify a payload into imminent / faraway / none.
///
/// Pure: two calls over the same payload yield the same outcome.
pub fn classify(response: &AvailabilityResponse) -> Result<SlotOutcome, ScanError> {
    if response.total > 0 {
        if response.availabilities.is_empty() {
            return Ok(SlotOutcome::MissingSlots);
        }

        let mut slots = Vec::new();
        for day in &response.availabilities {
            for raw in &day.slots {
                slots.push(parse_slot(raw)?);
            }
        }
        return Ok(SlotOutcome::Imminent(slots));
    }

    match &response.next_slot {
        Some(raw) => Ok(SlotOutcome::Faraway(parse_slot(raw)?)),
        None => Ok(SlotOutcome::NoSlots),
    }
}

/// Parse one upstream timestamp, e.g. `2025-06-01T09:30:00.000000+02:00`.
///
/// The string is split on the literal `T`; the offset is parsed and
/// discarded, slots are reported in the clinic's local time.
pub fn parse_slot(raw: &str) -> Result<SlotRecord, ScanError> {
    let Some((date_part, time_part)) = raw.split_once('T') else {
        return Err(ScanError::SlotFormat(format!(
            "{:?} has no 'T' separator",
            raw
        )));
    };

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| ScanError::SlotFormat(format!("bad date in {:?}: {}", raw, e)))?;
    let time = NaiveTime::parse_from_str(time_part, "%H:%M:%S%.f%:z")
        .map_err(|e| ScanError::SlotFormat(format!("bad time in {:?}: {}", raw, e)))?;

    Ok(SlotRecord {
        date,
        time,
        provider: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> AvailabilityResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_slot() {
        let slot = parse_slot("2025-06-01T09:30:00.000000+02:00").unwrap();
        assert_eq!(slot.formatted_date(), "Sunday, June 01, 2025");
        assert_eq!(slot.formatted_time(), "09:30");
        assert!(slot.provider.is_none());
    }

    #[test]
    fn test_parse_slot_without_separator() {
        let err = parse_slot("2025-06-01 09:30:00").unwrap_err();
        assert!(matches!(err, ScanError::SlotFormat(_)));
    }

    #[test]
    fn test_parse_slot_bad_time() {
        let err = parse_slot("2025-06-01Tnoon").unwrap_err();
        assert!(matches!(err, ScanError::SlotFormat(_)));
    }

    #[test]
    fn test_classify_imminent_collects_all_slots() {
        let response = payload(
            r#"{
                "total": 2,
                "availabilities": [
                    {"slots": ["2025-06-01T09:30:00.000000+02:00"]},
                    {"slots": ["2025-06-01T14:00:00.000000+02:00"]}
                ]
            }"#,
        );

        let SlotOutcome::Imminent(slots) = classify(&response).unwrap() else {
            panic!("expected imminent outcome");
        };
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].formatted_time(), "09:30");
        assert_eq!(slots[1].formatted_time(), "14:00");
    }

    #[test]
    fn test_classify_positive_total_without_availabilities() {
        let response = payload(r#"{"total": 3, "availabilities": []}"#);
        assert_eq!(classify(&response).unwrap(), SlotOutcome::MissingSlots);
    }

    #[test]
    fn test_classify_faraway() {
        let response = payload(
            r#"{"total": 0, "availabilities": [], "next_slot": "2025-07-10T10:00:00.000000+02:00"}"#,
        );

        let SlotOutcome::Faraway(slot) = classify(&response).unwrap() else {
            panic!("expected faraway outcome");
        };
        assert_eq!(slot.formatted_date(), "Thursday, July 10, 2025");
        assert_eq!(slot.formatted_time(), "10:00");
    }

    #[test]
    fn test_classify_missing_next_slot_is_silent() {
        let response = payload(r#"{"total": 0}"#);
        assert_eq!(classify(&response).unwrap(), SlotOutcome::NoSlots);
    }

    #[test]
    fn test_classify_is_stateless() {
        let response = payload(
            r#"{"total": 1, "availabilities": [{"slots": ["2025-06-01T09:30:00.000000+02:00"]}]}"#,
        );
        assert_eq!(classify(&response).unwrap(), classify(&response).unwrap());
    }
}
