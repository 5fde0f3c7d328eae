use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use anyhow::Result;
use chrono_tz::Tz;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub jwt_refresh_secs: i64,
    pub smtp: Option<SmtpSettings>,
    pub notifier_address: String,
    pub display_tz: Tz,
    /// Promoted to staff at startup.
    pub staff_usernames: Vec<String>,
}

pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub credentials: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("DOCKET_JWT_SECRET").unwrap_or_else(|| {
            warn!("DOCKET_JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let smtp = match var("DOCKET_SMTP_HOST") {
            Some(host) => Some(SmtpSettings {
                host,
                port: parse_or(&var, "DOCKET_SMTP_PORT", "587")?,
                credentials: var("DOCKET_SMTP_USERNAME")
                    .map(|user| (user, var("DOCKET_SMTP_PASSWORD").unwrap_or_default())),
            }),
            None => {
                info!("DOCKET_SMTP_HOST not set, notifications will only be logged");
                None
            }
        };

        let staff_usernames = var("DOCKET_STAFF_USERNAMES")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host: var("DOCKET_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "DOCKET_PORT", "8000")?,
            db_path: PathBuf::from(var("DOCKET_DB_PATH").unwrap_or_else(|| "docket.db".into())),
            jwt_secret,
            jwt_ttl_secs: parse_or(&var, "DOCKET_JWT_TTL_SECS", "3600")?,
            jwt_refresh_secs: parse_or(&var, "DOCKET_JWT_REFRESH_SECS", "604800")?,
            smtp,
            notifier_address: var("DOCKET_NOTIFIER_ADDRESS")
                .unwrap_or_else(|| "Complaints <noreply@localhost>".into()),
            display_tz: parse_or(&var, "DOCKET_DISPLAY_TZ", "Europe/Budapest")?,
            staff_usernames,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse()
        .map_err(|e: T::Err| anyhow::anyhow!("Invalid {key} value '{raw}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.jwt_ttl_secs, 3600);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.display_tz, chrono_tz::Europe::Budapest);
        assert!(config.smtp.is_none());
        assert!(config.staff_usernames.is_empty());
    }

    #[test]
    fn smtp_and_staff_list() {
        let config = load(&[
            ("DOCKET_SMTP_HOST", "smtp.example.com"),
            ("DOCKET_SMTP_USERNAME", "mailer"),
            ("DOCKET_SMTP_PASSWORD", "hunter2"),
            ("DOCKET_STAFF_USERNAMES", " support, boss ,,"),
        ])
        .unwrap();

        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.credentials, Some(("mailer".into(), "hunter2".into())));
        assert_eq!(config.staff_usernames, vec!["support", "boss"]);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(load(&[("DOCKET_PORT", "eighty")]).is_err());
        assert!(load(&[("DOCKET_DISPLAY_TZ", "Mars/Olympus")]).is_err());
    }
}
