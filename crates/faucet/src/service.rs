//! Faucet service core logic: the claim pipeline

use crate::amount::AmountGenerator;
use crate::captcha::CaptchaVerifier;
use crate::config::FaucetConfig;
use crate::error::{FaucetError, FaucetResult};
use crate::locks::AddressLocks;
use crate::metrics;
use crate::validation::{AddressValidator, ClaimForm, Rejection};
use crate::wallet::{Destination, WalletGateway};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use xenium_storage::{Ledgers, TransactionRecord};

/// How a claim ended, when it did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The submitted form did not pass structural checks
    Rejected(Rejection),
    CaptchaFailed,
    /// Unlocked balance is below the smallest payout
    InsufficientBalance { would_send: u64 },
    OnCooldown { next_eligible_at: DateTime<Utc> },
    Sent {
        address: String,
        /// Atomic units
        amount: u64,
        tx_hash: String,
    },
}

impl ClaimOutcome {
    /// Label used for `faucet_claims_total`
    pub fn metric_label(&self) -> &'static str {
        match self {
            ClaimOutcome::Rejected(_) => "invalid",
            ClaimOutcome::CaptchaFailed => "captcha",
            ClaimOutcome::InsufficientBalance { .. } => "balance",
            ClaimOutcome::OnCooldown { .. } => "cooldown",
            ClaimOutcome::Sent { .. } => "sent",
        }
    }
}

/// Faucet service
pub struct FaucetService {
    config: Arc<FaucetConfig>,
    ledgers: Ledgers,
    wallet: Arc<dyn WalletGateway>,
    captcha: Option<Arc<dyn CaptchaVerifier>>,
    faucet_address: String,
    validator: AddressValidator,
    amounts: AmountGenerator,
    locks: AddressLocks,
}

impl FaucetService {
    /// Create new faucet service. `captcha` is `None` when verification is
    /// turned off.
    pub fn new(
        config: Arc<FaucetConfig>,
        ledgers: Ledgers,
        wallet: Arc<dyn WalletGateway>,
        captcha: Option<Arc<dyn CaptchaVerifier>>,
        faucet_address: String,
    ) -> FaucetResult<Self> {
        let claim = &config.faucet;
        let validator = AddressValidator::new(claim.address_length, claim.address_prefix.clone());
        let amounts = AmountGenerator::new(claim.min_payout, claim.max_payout)?;

        Ok(Self {
            config,
            ledgers,
            wallet,
            captcha,
            faucet_address,
            validator,
            amounts,
            locks: AddressLocks::new(),
        })
    }

    pub fn config(&self) -> &FaucetConfig {
        &self.config
    }

    pub fn ledgers(&self) -> &Ledgers {
        &self.ledgers
    }

    pub fn faucet_address(&self) -> &str {
        &self.faucet_address
    }

    /// Handle one claim
    pub async fn claim(&self, form: Option<ClaimForm>, remote_ip: Option<IpAddr>) -> FaucetResult<ClaimOutcome> {
        self.claim_at(form, remote_ip, Utc::now()).await
    }

    /// Handle one claim as if received at `now`
    pub async fn claim_at(
        &self,
        form: Option<ClaimForm>,
        remote_ip: Option<IpAddr>,
        now: DateTime<Utc>,
    ) -> FaucetResult<ClaimOutcome> {
        let result = self.run_pipeline(form.as_ref(), remote_ip, now).await;
        match &result {
            Ok(outcome) => metrics::record_claim_outcome(outcome.metric_label()),
            Err(_) => metrics::record_claim_outcome("error"),
        }
        result
    }

    async fn run_pipeline(
        &self,
        form: Option<&ClaimForm>,
        remote_ip: Option<IpAddr>,
        now: DateTime<Utc>,
    ) -> FaucetResult<ClaimOutcome> {
        let address = match self.validator.validate(form, &self.faucet_address) {
            Ok(address) => address.to_string(),
            Err(rejection) => {
                debug!("Claim rejected: {}", rejection);
                return Ok(ClaimOutcome::Rejected(rejection));
            }
        };

        if let Some(captcha) = &self.captcha {
            let token = form.and_then(|f| f.captcha_response.as_deref());
            if !captcha.verify(token, remote_ip).await? {
                debug!("Captcha failed for {}", address);
                return Ok(ClaimOutcome::CaptchaFailed);
            }
        }

        let balance = self.wallet.balance().await?;
        let amount = self.amounts.draw();
        if balance.unlocked < self.amounts.min() {
            warn!(
                "Unlocked balance {} is below the minimum payout {}",
                balance.unlocked,
                self.amounts.min()
            );
            return Ok(ClaimOutcome::InsufficientBalance { would_send: amount });
        }

        let dispatch = Dispatch {
            ledgers: self.ledgers.clone(),
            wallet: self.wallet.clone(),
            locks: self.locks.clone(),
            window_ms: i64::try_from(self.config.faucet.claimable_every_ms).unwrap_or(i64::MAX),
        };
        // Detached so a dropped request cannot stop it between send and ledger writes
        tokio::spawn(dispatch.run(address, amount, now))
            .await
            .map_err(|e| FaucetError::Internal(format!("claim task failed: {}", e)))?
    }

    /// Fetch and log the faucet's balance, used at startup
    pub async fn log_balance(&self) -> FaucetResult<()> {
        let balance = self.wallet.balance().await?;
        info!(
            "Wallet balance: {} unlocked, {} locked (atomic units)",
            balance.unlocked, balance.locked
        );
        if balance.unlocked < self.amounts.min() {
            warn!("Unlocked balance is below the minimum payout, claims will be refused");
        }
        Ok(())
    }
}

/// Cooldown gate, send and ledger writes of one approved claim, under the
/// address lock. Owns its handles so it can run on its own task.
struct Dispatch {
    ledgers: Ledgers,
    wallet: Arc<dyn WalletGateway>,
    locks: AddressLocks,
    window_ms: i64,
}

impl Dispatch {
    async fn run(self, address: String, amount: u64, now: DateTime<Utc>) -> FaucetResult<ClaimOutcome> {
        // Held until both ledgers are written
        let _guard = self.locks.acquire(&address).await;

        let now_ms = now.timestamp_millis();
        if let Some(next) = self.cooldown_until(&address, now_ms)? {
            debug!("{} is on cooldown until {}", address, next);
            return Ok(ClaimOutcome::OnCooldown {
                next_eligible_at: DateTime::from_timestamp_millis(next).unwrap_or(now),
            });
        }

        let entry = self.ledgers.journal.begin(&address, amount, now_ms).await?;
        let destinations = [Destination {
            address: address.clone(),
            amount,
        }];

        let tx_hash = match self.wallet.send_advanced(&destinations).await {
            Ok(hash) => hash,
            Err(e) => {
                error!("Failed to send {} to {}: {}", amount, address, e);
                if let Err(journal_err) = self.ledgers.journal.abandon(entry.id).await {
                    error!("Failed to drop journal entry {}: {}", entry.id, journal_err);
                }
                return Err(e);
            }
        };

        metrics::COINS_SENT_ATOMIC_TOTAL.inc_by(amount);
        info!("Sent {} to {} in transaction {}", amount, address, tx_hash);

        if let Err(e) = self.ledgers.journal.mark_sent(entry.id, &tx_hash, now_ms).await {
            // Still Pending; if the ledger writes below fail too, the sweep
            // puts the address on cooldown and flags the entry
            error!("Failed to mark journal entry {} as sent: {}", entry.id, e);
        }

        if self.record(&address, amount, &tx_hash, now_ms).await {
            if let Err(e) = self.ledgers.journal.complete(entry.id).await {
                warn!("Failed to close journal entry {}: {}", entry.id, e);
            }
        }

        Ok(ClaimOutcome::Sent {
            address,
            amount,
            tx_hash,
        })
    }

    /// Unix milliseconds at which the address may claim again, if it may not
    /// claim now. A journal entry for the address blocks it as well: its send
    /// may have gone out without reaching the cooldown ledger yet.
    fn cooldown_until(&self, address: &str, now_ms: i64) -> FaucetResult<Option<i64>> {
        if let Some(record) = self.ledgers.claims.find_by_address(address)? {
            if record.is_on_cooldown(now_ms, self.window_ms) {
                return Ok(Some(record.next_eligible_at(self.window_ms)));
            }
        }
        if let Some(entry) = self.ledgers.journal.find_by_address(address)? {
            debug!("{} has journal entry {} in state {:?}", address, entry.id, entry.state);
            return Ok(Some(entry.created_at.saturating_add(self.window_ms).max(now_ms)));
        }
        Ok(None)
    }

    /// Write both ledgers, attempting each even if the other fails, and make
    /// the cooldown record durable. Returns whether all of it succeeded.
    async fn record(&self, address: &str, amount: u64, tx_hash: &str, at_ms: i64) -> bool {
        let mut claim = self.ledgers.claims.record_claim(address, at_ms).map(|_| ());
        if claim.is_ok() {
            claim = self.ledgers.claims.flush().await;
        }
        if let Err(e) = &claim {
            error!("Failed to record claim of {}: {}", address, e);
        }

        let tx = self.ledgers.transactions.append(&TransactionRecord {
            address: address.to_string(),
            amount,
            tx_hash: tx_hash.to_string(),
            recorded_at: at_ms,
        });
        if let Err(e) = &tx {
            error!("Failed to record transaction {}: {}", tx_hash, e);
        }

        claim.is_ok() && tx.is_ok()
    }
}

impl std::fmt::Debug for FaucetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaucetService")
            .field("faucet_address", &self.faucet_address)
            .field("amounts", &self.amounts)
            .field("captcha", &self.captcha.is_some())
            .finish()
    }
}
