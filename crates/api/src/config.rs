use std::str::FromStr;

use chrono::Duration;
use studyroom_core::billing::{BillingPolicy, DEFAULT_INVOICE_DUE_LEAD_HOURS};
use studyroom_core::cancellation::{CancellationPolicy, DEFAULT_NOTICE_WINDOW_HOURS};
use studyroom_core::pricing::{
    PricingPolicy, DEFAULT_GROUP_RATE_CENTS, DEFAULT_IN_HOME_RATE_CENTS,
    DEFAULT_ONLINE_RATE_CENTS,
};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development except the JWT
/// secret, which must always be provided.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight requests get to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Rates and invoice due-date rule.
    pub billing: BillingPolicy,
    /// Late-cancellation window and per-initiator switches.
    pub cancellation: CancellationPolicy,
    /// Where AUTHORISED invoices are forwarded. Unset disables forwarding.
    pub invoice_sink_url: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                                | Default                 |
    /// |----------------------------------------|-------------------------|
    /// | `HOST`                                 | `0.0.0.0`               |
    /// | `PORT`                                 | `3000`                  |
    /// | `CORS_ORIGINS`                         | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`                 | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`                | `30`                    |
    /// | `CANCELLATION_NOTICE_HOURS`            | `48`                    |
    /// | `CANCELLATION_INVOICE_LATE_PARENT`     | `true`                  |
    /// | `CANCELLATION_INVOICE_LATE_STUDYROOM`  | `true`                  |
    /// | `INVOICE_DUE_LEAD_HOURS`               | `48`                    |
    /// | `RATE_ONLINE_CENTS`                    | `6000`                  |
    /// | `RATE_IN_HOME_CENTS`                   | `7500`                  |
    /// | `RATE_GROUP_CENTS`                     | `4000`                  |
    /// | `INVOICE_SINK_URL`                     | unset                   |
    ///
    /// # Panics
    ///
    /// Panics on malformed values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_or("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 30);

        let pricing = PricingPolicy {
            online_cents_per_hour: env_or("RATE_ONLINE_CENTS", DEFAULT_ONLINE_RATE_CENTS),
            in_home_cents_per_hour: env_or("RATE_IN_HOME_CENTS", DEFAULT_IN_HOME_RATE_CENTS),
            group_cents_per_hour: env_or("RATE_GROUP_CENTS", DEFAULT_GROUP_RATE_CENTS),
        };
        let billing = BillingPolicy {
            pricing,
            due_lead: Duration::hours(env_or(
                "INVOICE_DUE_LEAD_HOURS",
                DEFAULT_INVOICE_DUE_LEAD_HOURS,
            )),
        };

        let mut cancellation = CancellationPolicy::with_notice_hours(env_or(
            "CANCELLATION_NOTICE_HOURS",
            DEFAULT_NOTICE_WINDOW_HOURS,
        ));
        cancellation.invoice_late_parent = env_or("CANCELLATION_INVOICE_LATE_PARENT", true);
        cancellation.invoice_late_studyroom =
            env_or("CANCELLATION_INVOICE_LATE_STUDYROOM", true);

        let invoice_sink_url = std::env::var("INVOICE_SINK_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            billing,
            cancellation,
            invoice_sink_url,
        }
    }
}

/// Read and parse an env var, falling back to `default` when unset.
fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{name} is invalid: {e}")),
        Err(_) => default,
    }
}
