//! Wallet gateway: the faucet's view of the remote wallet service

use crate::config::WalletConfig;
use crate::error::{FaucetError, FaucetResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Balance in atomic units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct WalletBalance {
    pub unlocked: u64,
    pub locked: u64,
}

impl WalletBalance {
    pub fn total(&self) -> u64 {
        self.unlocked.saturating_add(self.locked)
    }
}

/// Sync and network figures reported by the wallet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletStatus {
    pub hashrate: u64,
    pub wallet_block_count: u64,
    pub network_block_count: u64,
    pub peer_count: u64,
}

/// One payout of a send
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Destination {
    pub address: String,
    /// Atomic units
    pub amount: u64,
}

/// Parameters of `open`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenWallet {
    pub daemon_host: String,
    pub daemon_port: u16,
    pub filename: String,
    pub password: String,
}

impl From<&WalletConfig> for OpenWallet {
    fn from(config: &WalletConfig) -> Self {
        Self {
            daemon_host: config.daemon_host.clone(),
            daemon_port: config.daemon_port,
            filename: config.wallet_file.clone(),
            password: config.wallet_password.clone(),
        }
    }
}

#[async_trait]
pub trait WalletGateway: Send + Sync {
    async fn open(&self, params: &OpenWallet) -> FaucetResult<()>;
    async fn primary_address(&self) -> FaucetResult<String>;
    async fn balance(&self) -> FaucetResult<WalletBalance>;
    async fn status(&self) -> FaucetResult<WalletStatus>;
    /// Send to every destination in one transaction, returning its hash
    async fn send_advanced(&self, destinations: &[Destination]) -> FaucetResult<String>;
}

/// Client for the `wallet-api` REST service
pub struct WalletApiClient {
    base_url: String,
    api_key: String,
    mixin: u64,
    fee: Option<u64>,
    unlock_time: Option<u64>,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendAdvancedRequest<'a> {
    destinations: &'a [Destination],
    mixin: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unlock_time: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendAdvancedResponse {
    transaction_hash: String,
}

#[derive(Deserialize)]
struct PrimaryAddressResponse {
    address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    error_message: Option<String>,
}

impl WalletApiClient {
    pub fn new(config: &WalletConfig) -> FaucetResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("xenium-faucet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FaucetError::Internal(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
            mixin: config.default_mixin,
            fee: config.default_fee,
            unlock_time: config.default_unlock_time,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> FaucetResult<T> {
        let response = self
            .client
            .get(self.url(path))
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .map_err(|e| FaucetError::Wallet(format!("GET {} failed: {}", path, e)))?;

        Self::decode(path, response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> FaucetResult<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .header("X-API-KEY", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| FaucetError::Wallet(format!("POST {} failed: {}", path, e)))?;

        Self::check_status(path, response).await
    }

    async fn check_status(path: &str, response: reqwest::Response) -> FaucetResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error_message)
            .unwrap_or_else(|| status.to_string());
        Err(FaucetError::Wallet(format!("{} returned {}: {}", path, status.as_u16(), message)))
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> FaucetResult<T> {
        Self::check_status(path, response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FaucetError::Wallet(format!("Invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl WalletGateway for WalletApiClient {
    async fn open(&self, params: &OpenWallet) -> FaucetResult<()> {
        debug!("Opening wallet {} via {}:{}", params.filename, params.daemon_host, params.daemon_port);
        self.post("/wallet/open", params).await?;
        Ok(())
    }

    async fn primary_address(&self) -> FaucetResult<String> {
        let response: PrimaryAddressResponse = self.get("/addresses/primary").await?;
        Ok(response.address)
    }

    async fn balance(&self) -> FaucetResult<WalletBalance> {
        self.get("/balance").await
    }

    async fn status(&self) -> FaucetResult<WalletStatus> {
        self.get("/status").await
    }

    async fn send_advanced(&self, destinations: &[Destination]) -> FaucetResult<String> {
        let request = SendAdvancedRequest {
            destinations,
            mixin: self.mixin,
            fee: self.fee,
            unlock_time: self.unlock_time,
        };
        let path = "/transactions/send/advanced";
        let response = self.post(path, &request).await?;
        let body: SendAdvancedResponse = response
            .json()
            .await
            .map_err(|e| FaucetError::Wallet(format!("Invalid response from {}: {}", path, e)))?;
        Ok(body.transaction_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_shape() {
        let destinations = vec![Destination {
            address: "XNUabc".to_string(),
            amount: 1500,
        }];
        let request = SendAdvancedRequest {
            destinations: &destinations,
            mixin: 2,
            fee: None,
            unlock_time: Some(35),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "destinations": [{"address": "XNUabc", "amount": 1500}],
                "mixin": 2,
                "unlockTime": 35
            })
        );
    }

    #[test]
    fn test_status_decoding_ignores_extra_fields() {
        let status: WalletStatus = serde_json::from_value(serde_json::json!({
            "walletBlockCount": 100,
            "localDaemonBlockCount": 101,
            "networkBlockCount": 102,
            "peerCount": 8,
            "hashrate": 12345,
            "isViewWallet": false,
            "subWalletCount": 1
        }))
        .unwrap();
        assert_eq!(status.wallet_block_count, 100);
        assert_eq!(status.network_block_count, 102);
        assert_eq!(status.peer_count, 8);
        assert_eq!(status.hashrate, 12345);
    }

    #[test]
    fn test_open_params_from_config() {
        let config = WalletConfig::default();
        let open = OpenWallet::from(&config);
        let json = serde_json::to_value(&open).unwrap();
        assert_eq!(json["daemonHost"], "127.0.0.1");
        assert_eq!(json["daemonPort"], 32779);
        assert_eq!(json["filename"], "faucet");
    }

    #[tokio::test]
    async fn test_unreachable_wallet_is_a_wallet_error() {
        let config = WalletConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            request_timeout_secs: 2,
            ..Default::default()
        };
        let client = WalletApiClient::new(&config).unwrap();
        assert!(matches!(client.balance().await, Err(FaucetError::Wallet(_))));
    }
}
