// Rust guideline compliant 2026-10-16

//! Process configuration loaded from the environment (and an optional `.env`).
//!
//! Every value is validated here, at startup; a run never starts with a
//! setting it would later reject.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use domain::{Currency, DelayScheme};
use rust_decimal::Decimal;
use session::SessionConfig;
use volume_gate::GateConfig;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing required setting {var}")]
    Missing { var: &'static str },
    /// A variable is set but unusable.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Provider API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(String);

impl SecretKey {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

/// Fully validated settings for one process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absent in environments that never talk to the provider (demo).
    pub stripe_secret_key: Option<SecretKey>,
    /// Provider base URL without trailing slash.
    pub stripe_api_base: String,
    /// Gate, scheduler, timezone and pacing settings.
    pub session: SessionConfig,
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub logs_dir: PathBuf,
    /// Directory receiving one JSON audit file per processed run.
    pub data_dir: PathBuf,
    pub audit_db_url: String,
    /// `.env` file that was loaded, if any.
    pub env_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load `.env` when present, then read the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_file = dotenv::dotenv().ok();
        let mut config = Self::from_lookup(|var| std::env::var(var).ok())?;
        config.env_file = env_file;
        Ok(config)
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for the first variable that fails
    /// validation.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let or_default = |var: &str, default: &str| get(var).unwrap_or_else(|| default.to_owned());

        let currency: Currency = parse("ACCOUNT_CURRENCY", &or_default("ACCOUNT_CURRENCY", "AED"))?;
        let threshold: Decimal = parse("GROSS_VOLUME_LIMIT", &or_default("GROSS_VOLUME_LIMIT", "30"))?;
        let scheme: DelayScheme = parse("DELAY_SCHEME", &or_default("DELAY_SCHEME", "1,3,5,7,9"))?;
        let zone = business_time::parse_zone(&or_default("TIMEZONE", "Asia/Dubai"))
            .map_err(|e| ConfigError::Invalid { var: "TIMEZONE", reason: e.to_string() })?;
        let transfer_hour: u32 = parse("TRANSFER_HOUR", &or_default("TRANSFER_HOUR", "12"))?;
        let pacing_ms: u64 = parse("UPDATE_PACING_MS", &or_default("UPDATE_PACING_MS", "100"))?;

        let gate = GateConfig::builder(currency)
            .threshold(threshold)
            .build()
            .map_err(|e| ConfigError::Invalid { var: "GROSS_VOLUME_LIMIT", reason: e.to_string() })?;
        let session = SessionConfig::builder(gate, scheme)
            .zone(zone)
            .transfer_hour(transfer_hour)
            .pacing(Duration::from_millis(pacing_ms))
            .build()
            .map_err(|e| ConfigError::Invalid { var: "TRANSFER_HOUR", reason: e.to_string() })?;

        Ok(Self {
            stripe_secret_key: get("STRIPE_SECRET_KEY").map(SecretKey),
            stripe_api_base: or_default("STRIPE_API_BASE", "https://api.stripe.com")
                .trim_end_matches('/')
                .to_owned(),
            session,
            log_level: or_default("LOG_LEVEL", "info"),
            logs_dir: PathBuf::from(or_default("LOGS_DIR", "./logs")),
            data_dir: PathBuf::from(or_default("DATA_DIR", "./data")),
            audit_db_url: or_default("AUDIT_DB_URL", "sqlite:invoice_delay.db"),
            env_file: None,
        })
    }

    /// The provider key, for binaries that call the provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when `STRIPE_SECRET_KEY` is unset.
    pub fn require_stripe_key(&self) -> Result<&SecretKey, ConfigError> {
        self.stripe_secret_key.as_ref().ok_or(ConfigError::Missing { var: "STRIPE_SECRET_KEY" })
    }

    /// Today's date in the business zone; names the daily log file.
    #[must_use]
    pub fn business_today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.session.zone).date_naive()
    }
}

/// Knobs of the offline demo provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoSettings {
    /// `None` seeds from the OS.
    pub seed: Option<u64>,
    pub charges: usize,
    pub invoices: usize,
    /// Probability in `[0, 1]` that a due-date update is refused.
    pub failure_rate: f64,
}

impl DemoSettings {
    /// Read `DEMO_SEED`, `DEMO_CHARGES`, `DEMO_INVOICES`, `DEMO_FAILURE_RATE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unparsable values or a failure
    /// rate outside `[0, 1]`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let seed = get("DEMO_SEED").map(|raw| parse::<u64>("DEMO_SEED", &raw)).transpose()?;
        let charges = parse("DEMO_CHARGES", &get("DEMO_CHARGES").unwrap_or_else(|| "12".to_owned()))?;
        let invoices = parse("DEMO_INVOICES", &get("DEMO_INVOICES").unwrap_or_else(|| "7".to_owned()))?;
        let failure_rate: f64 =
            parse("DEMO_FAILURE_RATE", &get("DEMO_FAILURE_RATE").unwrap_or_else(|| "0.1".to_owned()))?;
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(ConfigError::Invalid {
                var: "DEMO_FAILURE_RATE",
                reason: format!("{failure_rate} is outside [0, 1]"),
            });
        }
        Ok(Self { seed, charges, invoices, failure_rate })
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid { var, reason: format!("{raw:?}: {e}") })
}
