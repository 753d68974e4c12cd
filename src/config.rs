use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::error::LedgerError;

/// Fallback signing key for development setups. Flagged at startup and
/// rejected outright when `APP_ENV=production`.
pub const INSECURE_DEFAULT_SECRET: &str = "insecure-dev-ledger-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
    pub recipient: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub hmac_secret: String,
    pub production: bool,
    pub server_host: String,
    pub server_port: u16,
    pub verification_interval_secs: u64,
    pub alert: Option<AlertConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, LedgerError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://ledger.db".to_string());

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let hmac_secret = match env::var("LEDGER_HMAC_SECRET") {
            Ok(secret) if !secret.is_empty() && secret != INSECURE_DEFAULT_SECRET => secret,
            _ if production => {
                return Err(LedgerError::Config(
                    "LEDGER_HMAC_SECRET must be set to a non-default value in production"
                        .to_string(),
                ));
            }
            _ => {
                warn!("LEDGER_HMAC_SECRET not set; using insecure default signing key");
                INSECURE_DEFAULT_SECRET.to_string()
            }
        };

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| LedgerError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

        let verification_interval_secs = env::var("VERIFICATION_INTERVAL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|e| LedgerError::Config(format!("Invalid VERIFICATION_INTERVAL_SECS: {}", e)))?;

        let alert = Self::load_alert_config();

        Ok(AppConfig {
            database_url,
            hmac_secret,
            production,
            server_host,
            server_port,
            verification_interval_secs,
            alert,
        })
    }

    /// Alerting is optional: all four variables must be present, otherwise
    /// the dispatcher degrades to a no-op.
    fn load_alert_config() -> Option<AlertConfig> {
        let api_url = env::var("ALERT_API_URL").ok()?;
        let api_key = env::var("ALERT_API_KEY").ok()?;
        let from = env::var("ALERT_FROM").ok()?;
        let recipient = env::var("ALERT_RECIPIENT").ok()?;
        Some(AlertConfig {
            api_url,
            api_key,
            from,
            recipient,
        })
    }

    pub fn uses_insecure_secret(&self) -> bool {
        self.hmac_secret == INSECURE_DEFAULT_SECRET
    }
}
