use std::time::Duration;

use notification_services::Mailer;
use reqwest::Client;
use tracing::{error, info};

use crate::availability::{AvailabilityClient, SlotOutcome, classify};
use crate::browser::{BrowserSession, BrowserSessionConfig};
use crate::extractor::Extractor;
use crate::reporter;
use crate::scan_types::{BlockedProviders, ProviderRecord, ScanError, SlotRecord};

/// Per-cycle behavior switches taken from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleOptions {
    /// Report only near-term slots.
    pub imminent_only: bool,
    /// Accumulate near-term slots and email them at cycle end.
    pub email: bool,
}

/// Runs one full scrape cycle: fetch, extract, resolve, report.
///
/// Holds no state across cycles; every run re-derives its collections from
/// scratch.
pub struct CycleExecutor {
    target_url: String,
    blocked: BlockedProviders,
    options: CycleOptions,
    mailer: Option<Mailer>,
}

impl CycleExecutor {
    /// Create an executor for the given search page.
    pub fn new(
        target_url: impl Into<String>,
        blocked: BlockedProviders,
        options: CycleOptions,
        mailer: Option<Mailer>,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            blocked,
            options,
            mailer,
        }
    }

    /// Run one cycle.
    ///
    /// The browser session is released on every path, including the
    /// bot-detection failure path, before this returns.
    pub async fn run_cycle(&self) -> Result<(), ScanError> {
        info!("Initializing driver…");
        let session = BrowserSession::launch(BrowserSessionConfig::default()).await?;

        let result = self.run_with_session(&session).await;

        info!("Exiting driver…");
        session.close().await;

        result
    }

    async fn run_with_session(&self, session: &BrowserSession) -> Result<(), ScanError> {
        info!("Starting scraping…");
        let logs = session.capture_search_logs(&self.target_url).await?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScanError::Api(format!("Failed to create HTTP client: {}", e)))?;

        let extractor = Extractor::new(client.clone(), self.blocked.clone());
        let report = extractor.collect_providers(&logs).await?;

        let mut imminent_slots: Vec<SlotRecord> = Vec::new();

        if report.providers.is_empty() {
            error!("No doctors found!");
        } else {
            let availability = AvailabilityClient::new(client);
            self.resolve_providers(session, &availability, &report.providers, &mut imminent_slots)
                .await?;
        }

        self.dispatch_alert(&imminent_slots).await
    }

    /// Resolve every provider strictly in sequence.
    ///
    /// A degraded payload (positive total, no availabilities) aborts the
    /// remaining providers of the cycle, not just the current one.
    async fn resolve_providers(
        &self,
        session: &BrowserSession,
        availability: &AvailabilityClient,
        providers: &[ProviderRecord],
        imminent_slots: &mut Vec<SlotRecord>,
    ) -> Result<(), ScanError> {
        for provider in providers {
            let response = availability.fetch(&provider.availability_url).await?;

            match classify(&response)? {
                SlotOutcome::Imminent(slots) => {
                    let name = session.provider_name(&provider.provider_id).await;
                    info!("Analyzing {}", provider.availability_url);
                    reporter::print_provider_header(name.as_deref());

                    for slot in slots {
                        reporter::print_imminent(&slot);
                        if self.options.email {
                            imminent_slots.push(SlotRecord {
                                provider: name.clone(),
                                ..slot
                            });
                        }
                    }
                }
                SlotOutcome::MissingSlots => {
                    let name = session.provider_name(&provider.provider_id).await;
                    info!("Analyzing {}", provider.availability_url);
                    reporter::print_provider_header(name.as_deref());
                    error!("No valid appointments found!");
                    break;
                }
                outcome @ SlotOutcome::Faraway(_) => {
                    if let Some(slot) = Self::faraway_to_print(&self.options, &outcome) {
                        info!("Analyzing {}", provider.availability_url);
                        reporter::print_faraway(slot);
                    }
                }
                SlotOutcome::NoSlots => {}
            }
        }

        Ok(())
    }

    /// The faraway slot to report for an outcome, if any.
    ///
    /// Imminent-only mode suppresses faraway lines entirely, even when the
    /// upstream reported a `next_slot`.
    fn faraway_to_print<'a>(
        options: &CycleOptions,
        outcome: &'a SlotOutcome,
    ) -> Option<&'a SlotRecord> {
        match outcome {
            SlotOutcome::Faraway(slot) if !options.imminent_only => Some(slot),
            _ => None,
        }
    }

    /// Send the batched alert, exactly once per cycle, when slots were found.
    async fn dispatch_alert(&self, imminent_slots: &[SlotRecord]) -> Result<(), ScanError> {
        if imminent_slots.is_empty() {
            return Ok(());
        }
        let Some(mailer) = &self.mailer else {
            return Ok(());
        };

        let (subject, body) = reporter::compose_alert(imminent_slots);
        mailer.send(&subject, &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use notification_services::MockEmailService;
    use std::sync::Arc;

    fn slot() -> SlotRecord {
        SlotRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            provider: Some("Dr. Martin".to_string()),
        }
    }

    fn executor(mailer: Option<Mailer>) -> CycleExecutor {
        CycleExecutor::new(
            "https://www.doctolib.fr/dermatologue/paris",
            BlockedProviders::default(),
            CycleOptions {
                imminent_only: true,
                email: true,
            },
            mailer,
        )
    }

    #[tokio::test]
    async fn test_dispatch_alert_sends_one_email() {
        let service = Arc::new(MockEmailService::default());
        let mailer = Mailer::new(service.clone(), "me@example.com");

        executor(Some(mailer))
            .dispatch_alert(&[slot(), slot()])
            .await
            .unwrap();

        let sent = service.sent.lock().await;
        assert_eq!(sent.len(), 1);
        let (to, subject, body) = &sent[0];
        assert_eq!(to, "me@example.com");
        assert_eq!(subject, "Found 2 imminent appointments on Doctolib");
        assert_eq!(body.matches("Dr. Martin").count(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_alert_skips_empty_batch() {
        let service = Arc::new(MockEmailService::default());
        let mailer = Mailer::new(service.clone(), "me@example.com");

        executor(Some(mailer)).dispatch_alert(&[]).await.unwrap();

        assert!(service.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_alert_without_mailer() {
        executor(None).dispatch_alert(&[slot()]).await.unwrap();
    }

    #[test]
    fn test_faraway_suppressed_in_imminent_only_mode() {
        let options = CycleOptions {
            imminent_only: true,
            email: false,
        };
        let outcome = SlotOutcome::Faraway(slot());

        assert!(CycleExecutor::faraway_to_print(&options, &outcome).is_none());
    }

    #[test]
    fn test_faraway_reported_by_default() {
        let options = CycleOptions::default();
        let outcome = SlotOutcome::Faraway(slot());

        let reported = CycleExecutor::faraway_to_print(&options, &outcome).unwrap();
        assert_eq!(reported.formatted_time(), "09:30");
    }

    #[test]
    fn test_non_faraway_outcomes_never_print_faraway() {
        let options = CycleOptions::default();

        for outcome in [
            SlotOutcome::Imminent(vec![slot()]),
            SlotOutcome::NoSlots,
            SlotOutcome::MissingSlots,
        ] {
            assert!(CycleExecutor::faraway_to_print(&options, &outcome).is_none());
        }
    }
}
