//! Console output and email alert composition.
//!
//! Discovered slots are user-facing output, printed with `println!` rather
//! than emitted as log records, so they show up regardless of the configured
//! log level.

use crate::scan_types::SlotRecord;

const GREEN: &str = "\x1b[32m";
const BLUE: &str = "\x1b[34m";
const VIOLET: &str = "\x1b[35m";
const RESET: &str = "\x1b[0m";

const HEADER_WIDTH: usize = 60;

/// Print the violet banner that precedes a provider's slots.
pub fn print_provider_header(name: Option<&str>) {
    let label = name.unwrap_or("[unknown]");
    let tagged = format!("{} {} {}", VIOLET, label, RESET);
    println!("{}", center(&tagged, '=', HEADER_WIDTH));
}

/// Print one near-term slot line.
pub fn print_imminent(slot: &SlotRecord) {
    println!(
        "{}Found imminent slot:{} {} at {}",
        GREEN,
        RESET,
        slot.formatted_date(),
        slot.formatted_time()
    );
}

/// Print the single earliest-slot line for a provider with no near-term
/// availability.
pub fn print_faraway(slot: &SlotRecord) {
    println!(
        "{}Found faraway slot:{} {} at {}",
        BLUE,
        RESET,
        slot.formatted_date(),
        slot.formatted_time()
    );
}

/// Compose the subject and body of the batched alert email.
///
/// The subject wording is count-sensitive: singular for exactly one slot,
/// plural otherwise.
pub fn compose_alert(slots: &[SlotRecord]) -> (String, String) {
    let subject = if slots.len() == 1 {
        "Found 1 imminent appointment on Doctolib".to_string()
    } else {
        format!("Found {} imminent appointments on Doctolib", slots.len())
    };

    let mut body = String::from("The following imminent appointments are available:\n\n");
    for slot in slots {
        match &slot.provider {
            Some(name) => body.push_str(&format!(
                "- {} @ {} with {}\n",
                slot.formatted_date(),
                slot.formatted_time(),
                name
            )),
            None => body.push_str(&format!(
                "- {} @ {}\n",
                slot.formatted_date(),
                slot.formatted_time()
            )),
        }
    }

    (subject, body)
}

fn center(text: &str, pad: char, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!(
        "{}{}{}",
        pad.to_string().repeat(left),
        text,
        pad.to_string().repeat(right)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn slot(provider: Option<&str>) -> SlotRecord {
        SlotRecord {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            provider: provider.map(str::to_string),
        }
    }

    #[test]
    fn test_compose_alert_singular_subject() {
        let (subject, _) = compose_alert(&[slot(None)]);
        assert_eq!(subject, "Found 1 imminent appointment on Doctolib");
    }

    #[test]
    fn test_compose_alert_plural_subject() {
        let (subject, _) = compose_alert(&[slot(None), slot(None)]);
        assert_eq!(subject, "Found 2 imminent appointments on Doctolib");
    }

    #[test]
    fn test_compose_alert_body_with_provider() {
        let (_, body) = compose_alert(&[slot(Some("Dr. Martin"))]);
        assert!(body.starts_with("The following imminent appointments are available:\n\n"));
        assert!(body.contains("- Sunday, June 01, 2025 @ 09:30 with Dr. Martin\n"));
    }

    #[test]
    fn test_compose_alert_body_without_provider() {
        let (_, body) = compose_alert(&[slot(None)]);
        assert!(body.contains("- Sunday, June 01, 2025 @ 09:30\n"));
        assert!(!body.contains("with"));
    }

    #[test]
    fn test_center_pads_both_sides() {
        assert_eq!(center("ab", '=', 6), "==ab==");
        assert_eq!(center("abc", '=', 6), "=abc==");
        assert_eq!(center("abcdef", '=', 4), "abcdef");
    }
}
