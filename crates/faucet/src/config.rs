//! Faucet configuration

use crate::error::{FaucetError, FaucetResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use xenium_common::utils::logging::LoggingConfig;

/// Prefix of the environment variables that override file settings,
/// e.g. `FAUCET_WALLET__PORT=8070`.
pub const ENV_PREFIX: &str = "FAUCET";

/// Faucet service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaucetConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub wallet: WalletConfig,
    pub captcha: CaptchaConfig,
    pub faucet: ClaimConfig,
    pub frontend: FrontendConfig,
    pub admin: AdminConfig,
    pub poller: PollerConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server address
    pub addr: String,
    /// Enable permissive CORS
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8909".to_string(),
            cors_enabled: false,
        }
    }
}

/// Ledger locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Cooldown ledger database
    pub addresses_path: String,
    /// Transaction ledger and send journal database
    pub transactions_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            addresses_path: "./faucet_data/addresses.db".to_string(),
            transactions_path: "./faucet_data/transactions.db".to_string(),
        }
    }
}

/// wallet-api connection and coin parameters
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Host the wallet API listens on
    pub host: String,
    pub port: u16,
    /// Value of the `X-API-KEY` header
    pub api_key: String,

    /// Open `wallet_file` on startup
    pub open_wallet: bool,
    pub wallet_file: String,
    pub wallet_password: String,
    pub daemon_host: String,
    pub daemon_port: u16,

    /// Digits after the decimal point; the atomic divisor is `10^decimal_places`
    pub decimal_places: u32,
    pub default_mixin: u64,
    /// Network fee in atomic units, wallet default when unset
    pub default_fee: Option<u64>,
    pub default_unlock_time: Option<u64>,
    pub request_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 32780,
            api_key: "faucet".to_string(),
            open_wallet: false,
            wallet_file: "faucet".to_string(),
            wallet_password: "faucet".to_string(),
            daemon_host: "127.0.0.1".to_string(),
            daemon_port: 32779,
            decimal_places: 3,
            default_mixin: 2,
            default_fee: None,
            default_unlock_time: None,
            request_timeout_secs: 30,
        }
    }
}

/// Custom Debug that keeps wallet credentials out of the logs.
impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &"<redacted>")
            .field("open_wallet", &self.open_wallet)
            .field("wallet_file", &self.wallet_file)
            .field("wallet_password", &"<redacted>")
            .field("daemon_host", &self.daemon_host)
            .field("daemon_port", &self.daemon_port)
            .field("decimal_places", &self.decimal_places)
            .field("default_mixin", &self.default_mixin)
            .field("default_fee", &self.default_fee)
            .field("default_unlock_time", &self.default_unlock_time)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl WalletConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Atomic units per displayed coin
    pub fn decimal_divisor(&self) -> u64 {
        10u64.pow(self.decimal_places)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Google reCAPTCHA v2
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    pub enabled: bool,
    pub site_key: String,
    pub secret_key: String,
    pub verify_url: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            site_key: String::new(),
            secret_key: String::new(),
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
        }
    }
}

impl fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("enabled", &self.enabled)
            .field("site_key", &self.site_key)
            .field("secret_key", &"<redacted>")
            .field("verify_url", &self.verify_url)
            .finish()
    }
}

/// Payout and address rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    /// Smallest payout, atomic units (inclusive)
    pub min_payout: u64,
    /// Largest payout, atomic units (exclusive)
    pub max_payout: u64,
    pub address_length: usize,
    pub address_prefix: String,
    /// Cooldown window between two claims of one address
    pub claimable_every_ms: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            min_payout: 1000,
            max_payout: 25000,
            address_length: 98,
            address_prefix: "XNU".to_string(),
            claimable_every_ms: 24 * 60 * 60 * 1000, // 24 hours
        }
    }
}

impl ClaimConfig {
    pub fn claimable_every(&self) -> Duration {
        Duration::from_millis(self.claimable_every_ms)
    }
}

/// Text shown on the pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub coin_name: String,
    pub ticker: String,
    /// Human readable cooldown, e.g. "24 hours"
    pub claimable_every_label: String,
    pub owner: String,
    pub owner_discord: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            coin_name: "Xenium".to_string(),
            ticker: "XNU".to_string(),
            claimable_every_label: "24 hours".to_string(),
            owner: String::new(),
            owner_discord: String::new(),
        }
    }
}

/// Credentials for `GET /admin`
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub username: String,
    /// The admin page is disabled while unset
    pub password: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
        }
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Background task intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_secs: u64,
    pub reconcile_interval_secs: u64,
    /// Age after which a `Pending` journal entry is no longer considered in flight
    pub in_flight_grace_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            reconcile_interval_secs: 60,
            in_flight_grace_secs: 300,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn in_flight_grace(&self) -> Duration {
        Duration::from_secs(self.in_flight_grace_secs)
    }
}

impl FaucetConfig {
    /// Load defaults, then the optional file, then `FAUCET_*` environment variables.
    pub fn load(path: Option<&Path>) -> FaucetResult<Self> {
        let config: Self = xenium_common::utils::config::load_config(path, ENV_PREFIX)
            .map_err(|e| FaucetError::Config(format!("{:#}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the claim pipeline cannot work with
    pub fn validate(&self) -> FaucetResult<()> {
        let claim = &self.faucet;
        if claim.min_payout > claim.max_payout {
            return Err(FaucetError::Config(format!(
                "min_payout ({}) is larger than max_payout ({})",
                claim.min_payout, claim.max_payout
            )));
        }
        if claim.address_length == 0 {
            return Err(FaucetError::Config("address_length must be positive".to_string()));
        }
        if claim.address_prefix.is_empty() {
            return Err(FaucetError::Config("address_prefix must not be empty".to_string()));
        }
        if claim.address_prefix.chars().count() > claim.address_length {
            return Err(FaucetError::Config(
                "address_prefix is longer than address_length".to_string(),
            ));
        }
        if self.wallet.decimal_places > 18 {
            return Err(FaucetError::Config("decimal_places must be at most 18".to_string()));
        }
        if self.captcha.enabled
            && (self.captcha.site_key.is_empty() || self.captcha.secret_key.is_empty())
        {
            return Err(FaucetError::Config(
                "captcha is enabled but site_key or secret_key is missing".to_string(),
            ));
        }
        if self.poller.interval_secs == 0 || self.poller.reconcile_interval_secs == 0 {
            return Err(FaucetError::Config("poller intervals must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = FaucetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.addr, "0.0.0.0:8909");
        assert_eq!(config.wallet.decimal_divisor(), 1000);
        assert_eq!(config.faucet.claimable_every(), Duration::from_secs(86400));
        assert_eq!(config.poller.interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = FaucetConfig::default();
        config.faucet.min_payout = 30000;
        assert!(matches!(config.validate(), Err(FaucetError::Config(_))));

        let mut config = FaucetConfig::default();
        config.faucet.address_prefix = String::new();
        assert!(config.validate().is_err());

        let mut config = FaucetConfig::default();
        config.captcha.enabled = true;
        config.captcha.site_key = "site".to_string();
        assert!(config.validate().is_err());

        let mut config = FaucetConfig::default();
        config.poller.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_equal_max_is_allowed() {
        let mut config = FaucetConfig::default();
        config.faucet.min_payout = 5000;
        config.faucet.max_payout = 5000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut config = FaucetConfig::default();
        config.wallet.api_key = "super-secret-key".to_string();
        config.captcha.secret_key = "captcha-secret".to_string();
        config.admin.password = Some("hunter2".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert!(!rendered.contains("captcha-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faucet.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[faucet]\nmin_payout = 10\nmax_payout = 20\n\n[frontend]\ncoin_name = \"Drip\""
        )
        .unwrap();

        let config = FaucetConfig::load(Some(&path)).unwrap();
        assert_eq!(config.faucet.min_payout, 10);
        assert_eq!(config.faucet.max_payout, 20);
        assert_eq!(config.faucet.address_prefix, "XNU");
        assert_eq!(config.frontend.coin_name, "Drip");
        assert_eq!(config.wallet.port, 32780);
    }
}
