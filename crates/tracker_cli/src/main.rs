//! Doctolib appointment tracker.
//!
//! Scrapes a search-results page in an endless loop and reports imminent and
//! faraway appointment slots, optionally emailing a batched alert whenever
//! imminent slots were found.

mod config;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use doctor_scan::ScanError;
use doctor_scan::executor::{CycleExecutor, CycleOptions};
use notification_services::{Mailer, SmtpEmailService};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Command-line options.
#[derive(Debug, Parser)]
#[command(
    name = "doctolib-tracker",
    about = "Watch a Doctolib search page for appointment slots"
)]
struct Cli {
    /// Doctolib URL to scrape
    url: String,

    /// Time to wait between requests, in seconds
    #[arg(short, long, default_value_t = 600)]
    delay: u64,

    /// Show only imminent appointments
    #[arg(short, long)]
    imminent: bool,

    /// Send an email if an imminent appointment has been found
    #[arg(short, long, requires = "imminent")]
    email: bool,

    /// Logging level (critical, error, warning, info, debug)
    #[arg(short, long, default_value = "warning")]
    loglevel: String,
}

fn tracing_level(loglevel: &str) -> &'static str {
    match loglevel.to_ascii_lowercase().as_str() {
        "critical" | "error" => "error",
        "info" => "info",
        "debug" => "debug",
        _ => "warn",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(tracing_level(&cli.loglevel)))
        .with_target(false)
        .init();

    let app_config = AppConfig::load(config::CONFIG_PATH)?;

    let mailer = if cli.email {
        let Some(email_config) = app_config.email.clone() else {
            bail!(
                "--email requires a complete [email-config] section in {}",
                config::CONFIG_PATH
            );
        };
        let service = SmtpEmailService::new(&email_config)?;
        Some(Mailer::new(Arc::new(service), email_config.address))
    } else {
        None
    };

    let options = CycleOptions {
        imminent_only: cli.imminent,
        email: cli.email,
    };
    let executor = CycleExecutor::new(cli.url, app_config.blocked, options, mailer);

    let (shutdown_tx, mut shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    loop {
        if *shutdown.borrow() {
            println!("\nEnding program…");
            return Ok(());
        }

        match executor.run_cycle().await {
            Ok(()) => {}
            Err(ScanError::BotDetected) => {
                // not worth retrying within hours; bail out entirely
                error!(
                    "Failed to bypass Doctolib's bot detection. \
                     Please try again in a couple of hours."
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }

        for remaining in (1..=cli.delay).rev() {
            tokio::select! {
                _ = shutdown.changed() => {
                    println!("\nEnding program…");
                    return Ok(());
                }
                _ = sleep(Duration::from_secs(1)) => {
                    print!("Retrying in: {} seconds\r", remaining);
                    let _ = io::stdout().flush();
                }
            }
        }
    }
}
