//! # Doctor Scan
//!
//! Core library for the Doctolib appointment tracker. It drives a Chromium
//! session over a specialty/location search page, extracts provider
//! identifiers from the captured network traffic, resolves per-provider
//! availability, and reports discovered appointment slots.

/// Availability lookups and slot classification.
pub mod availability;
/// Browser session management: navigation, network capture, DOM lookups.
pub mod browser;
/// Cycle orchestration (fetch, extract, resolve, report).
pub mod executor;
/// Provider extraction from captured network logs.
pub mod extractor;
/// Console output and email alert composition.
pub mod reporter;

/// Shared types for scan operations.
mod scan_types;
pub use scan_types::*;
