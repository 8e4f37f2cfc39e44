use std::path::Path;

use anyhow::{Context, Result, anyhow};
use configparser::ini::Ini;
use doctor_scan::BlockedProviders;
use notification_services::EmailConfig;

/// Default location of the INI configuration file.
pub const CONFIG_PATH: &str = "config/config.ini";

/// Application configuration loaded once at startup and passed by reference
/// into the components that need it.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Raw blocked-id list from `[main] blocked_doctor_ids`.
    pub blocked: BlockedProviders,
    /// SMTP settings, present when the `[email-config]` section is complete.
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Load the configuration file. A missing file yields the defaults: no
    /// blocked ids and no email settings.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }

        let mut ini = Ini::new();
        ini.load(path)
            .map_err(|e| anyhow!("failed to read {}: {}", path, e))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let blocked =
            BlockedProviders::new(ini.get("main", "blocked_doctor_ids").unwrap_or_default());

        let email = match (
            ini.get("email-config", "email_address"),
            ini.get("email-config", "email_password"),
            ini.get("email-config", "email_server"),
            ini.get("email-config", "email_port"),
        ) {
            (Some(address), Some(password), Some(server), Some(port)) => {
                let port = port
                    .parse::<u16>()
                    .with_context(|| format!("invalid email_port {:?}", port))?;
                Some(EmailConfig {
                    address,
                    password,
                    server,
                    port,
                })
            }
            _ => None,
        };

        Ok(Self { blocked, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini_from(content: &str) -> Ini {
        let mut ini = Ini::new();
        ini.read(content.to_string()).unwrap();
        ini
    }

    #[test]
    fn test_full_config() {
        let ini = ini_from(
            "[main]\n\
             blocked_doctor_ids = 123456, 789012\n\
             [email-config]\n\
             email_address = alerts@example.com\n\
             email_password = hunter2\n\
             email_server = smtp.example.com\n\
             email_port = 587\n",
        );

        let config = AppConfig::from_ini(&ini).unwrap();
        assert!(config.blocked.contains("123456"));
        assert!(!config.blocked.contains("555"));

        let email = config.email.unwrap();
        assert_eq!(email.address, "alerts@example.com");
        assert_eq!(email.server, "smtp.example.com");
        assert_eq!(email.port, 587);
    }

    #[test]
    fn test_missing_email_section() {
        let ini = ini_from("[main]\nblocked_doctor_ids = 123\n");
        let config = AppConfig::from_ini(&ini).unwrap();
        assert!(config.email.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let ini = ini_from(
            "[email-config]\n\
             email_address = a@b.c\n\
             email_password = p\n\
             email_server = s\n\
             email_port = not-a-port\n",
        );
        assert!(AppConfig::from_ini(&ini).is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load("config/does-not-exist.ini").unwrap();
        assert!(config.email.is_none());
        assert!(!config.blocked.contains("123"));
    }
}
