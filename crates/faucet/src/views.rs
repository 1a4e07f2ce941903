//! HTML pages, rendered from plain string templates

use crate::config::FaucetConfig;
use crate::status::WalletStatusSnapshot;
use crate::validation::Rejection;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use xenium_common::utils::format::pretty_atomic;
use xenium_storage::{ClaimRecord, PendingSend, SendState, TransactionRecord};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest address prefix shown on the public cooldown list
const COOLDOWN_ADDRESS_CHARS: usize = 50;

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// `Fri, 16 Oct 2026 12:00:00 GMT`
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Everything the shared layout needs
pub struct PageContext<'a> {
    pub config: &'a FaucetConfig,
    pub status: &'a WalletStatusSnapshot,
    pub faucet_address: &'a str,
}

impl<'a> PageContext<'a> {
    fn amount(&self, atomic: u64) -> String {
        format!(
            "{} {}",
            pretty_atomic(atomic, self.config.wallet.decimal_places),
            escape_html(&self.config.frontend.ticker)
        )
    }

    fn layout(&self, title: &str, body: &str) -> String {
        let frontend = &self.config.frontend;
        let claim = &self.config.faucet;
        let status = self.status;
        let coin = escape_html(&frontend.coin_name);

        let captcha_script = if self.config.captcha.enabled {
            r#"<script src="https://www.google.com/recaptcha/api.js" async defer></script>"#
        } else {
            ""
        };
        let owner = if frontend.owner.is_empty() {
            String::new()
        } else {
            format!(
                "<p>Run by {} {}</p>",
                escape_html(&frontend.owner),
                escape_html(&frontend.owner_discord)
            )
        };
        let updated = status
            .updated_at
            .map(http_date)
            .unwrap_or_else(|| "never".to_string());

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{coin} Faucet | {title}</title>
{captcha_script}
</head>
<body>
<header>
<h1><a href="/">{coin} Faucet</a></h1>
<nav><a href="/">Claim</a> | <a href="/cooldowns">Cooldowns</a> | <a href="/about">About</a></nav>
</header>
<main>
{body}
</main>
<aside>
<h3>Faucet</h3>
<p>Address: <code>{address}</code></p>
<p>Payout: {min} to {max}, once every {every}</p>
<p>Balance: {total} ({unlocked} unlocked, {locked} locked)</p>
<p>Sent: {sent_count} transactions, {sent_total} {ticker}</p>
<p>Known addresses: {addresses}</p>
<h3>Network</h3>
<p>Hashrate: {hashrate}</p>
<p>Sync: {wallet_height}/{network_height} ({sync}%)</p>
<p>Peers: {peers}</p>
<p><small>Updated {updated}</small></p>
</aside>
<footer>
{owner}
<p>{coin} faucet v{version}</p>
</footer>
</body>
</html>
"#,
            coin = coin,
            title = escape_html(title),
            captcha_script = captcha_script,
            body = body,
            address = escape_html(self.faucet_address),
            min = self.amount(claim.min_payout),
            max = self.amount(claim.max_payout),
            every = escape_html(&frontend.claimable_every_label),
            total = escape_html(&status.total_balance),
            unlocked = escape_html(&status.unlocked_balance),
            locked = escape_html(&status.locked_balance),
            sent_count = escape_html(&status.total_transactions_sent),
            sent_total = escape_html(&status.total_coins_sent),
            ticker = escape_html(&frontend.ticker),
            addresses = escape_html(&status.addresses_known),
            hashrate = escape_html(&status.net_hashrate),
            wallet_height = escape_html(&status.wallet_block_height),
            network_height = escape_html(&status.network_block_height),
            sync = escape_html(&status.sync_percent),
            peers = escape_html(&status.peer_count),
            updated = updated,
            owner = owner,
            version = VERSION,
        )
    }

    fn claim_form(&self) -> String {
        let captcha = if self.config.captcha.enabled {
            format!(
                r#"<div class="g-recaptcha" data-sitekey="{}"></div>"#,
                escape_html(&self.config.captcha.site_key)
            )
        } else {
            String::new()
        };

        format!(
            r#"<form method="post" action="/claimCoins">
<label for="address">Your {coin} Wallet Address</label>
<input type="text" id="address" name="address" maxlength="{len}" placeholder="{prefix}..." required>
{captcha}
<button type="submit">Claim</button>
</form>"#,
            coin = escape_html(&self.config.frontend.coin_name),
            len = self.config.faucet.address_length,
            prefix = escape_html(&self.config.faucet.address_prefix),
            captcha = captcha,
        )
    }

    pub fn index(&self) -> String {
        self.layout("Claim", &self.claim_form())
    }

    pub fn about(&self) -> String {
        let frontend = &self.config.frontend;
        let body = format!(
            "<h2>About</h2>\n<p>This faucet hands out small amounts of {coin} ({ticker}) so new users can try the network. \
             Each address can claim between {min} and {max} once every {every}.</p>",
            coin = escape_html(&frontend.coin_name),
            ticker = escape_html(&frontend.ticker),
            min = self.amount(self.config.faucet.min_payout),
            max = self.amount(self.config.faucet.max_payout),
            every = escape_html(&frontend.claimable_every_label),
        );
        self.layout("About", &body)
    }

    pub fn claim_rejected(&self, reason: &Rejection) -> String {
        let body = format!(
            "<h2>Invalid claim</h2>\n<p class=\"error\">{}</p>\n{}",
            escape_html(&reason.to_string()),
            self.claim_form()
        );
        self.layout("Invalid claim", &body)
    }

    pub fn captcha_failed(&self) -> String {
        let body = format!(
            "<h2>Captcha failed</h2>\n<p class=\"error\">Your Captcha is invalid. Please try again later. \
             This might also mean that you are a bot.</p>\n{}",
            self.claim_form()
        );
        self.layout("Captcha failed", &body)
    }

    pub fn not_enough_balance(&self, would_send: u64) -> String {
        let body = format!(
            "<h2>Not enough balance</h2>\n<p>The faucet would have sent you {}, but its unlocked balance \
             is too low right now. Please try again later.</p>",
            self.amount(would_send)
        );
        self.layout("Not enough balance", &body)
    }

    pub fn already_claimed(&self, next_eligible_at: DateTime<Utc>) -> String {
        let body = format!(
            "<h2>Already claimed</h2>\n<p>This address already claimed coins in the last {}. \
             You can claim again after {}.</p>",
            escape_html(&self.config.frontend.claimable_every_label),
            http_date(next_eligible_at)
        );
        self.layout("Already claimed", &body)
    }

    pub fn coins_sent(&self, address: &str, amount: u64, tx_hash: &str) -> String {
        let body = format!(
            "<h2>Coins sent</h2>\n<p>{} are on their way to <code>{}</code>.</p>\n<p>Transaction hash: <code>{}</code></p>",
            self.amount(amount),
            escape_html(address),
            escape_html(tx_hash)
        );
        self.layout("Coins sent", &body)
    }

    pub fn error(&self, message: &str) -> String {
        let body = format!("<h2>Error</h2>\n<p class=\"error\">{}</p>", escape_html(message));
        self.layout("Error", &body)
    }

    pub fn cooldowns(&self, records: &[ClaimRecord]) -> String {
        let window_ms = i64::try_from(self.config.faucet.claimable_every_ms).unwrap_or(i64::MAX);
        let mut rows = String::new();
        for record in records {
            let next = DateTime::from_timestamp_millis(record.next_eligible_at(window_ms)).unwrap_or_default();
            let _ = writeln!(
                rows,
                "<tr><td><code>{}</code></td><td>{}</td></tr>",
                escape_html(&truncate_address(&record.address)),
                http_date(next)
            );
        }

        let body = format!(
            "<h2>Cooldowns</h2>\n<table>\n<tr><th>Address</th><th>Can claim again</th></tr>\n{}</table>",
            rows
        );
        self.layout("Cooldowns", &body)
    }

    pub fn admin(
        &self,
        claims: &[ClaimRecord],
        transactions: &[TransactionRecord],
        journal: &[PendingSend],
    ) -> String {
        let mut body = String::from("<h2>Admin</h2>\n");

        let _ = writeln!(body, "<h3>Addresses ({})</h3>\n<table>", claims.len());
        body.push_str("<tr><th>Address</th><th>Last claim</th></tr>\n");
        for record in claims {
            let _ = writeln!(
                body,
                "<tr><td><code>{}</code></td><td>{}</td></tr>",
                escape_html(&record.address),
                http_date(record.last_claim_datetime())
            );
        }
        body.push_str("</table>\n");

        let _ = writeln!(body, "<h3>Transactions ({})</h3>\n<table>", transactions.len());
        body.push_str("<tr><th>Hash</th><th>Address</th><th>Amount</th><th>Time</th></tr>\n");
        for tx in transactions {
            let at = DateTime::from_timestamp_millis(tx.recorded_at).unwrap_or_default();
            let _ = writeln!(
                body,
                "<tr><td><code>{}</code></td><td><code>{}</code></td><td>{}</td><td>{}</td></tr>",
                escape_html(&tx.tx_hash),
                escape_html(&tx.address),
                self.amount(tx.amount),
                http_date(at)
            );
        }
        body.push_str("</table>\n");

        let _ = writeln!(body, "<h3>Send journal ({})</h3>\n<table>", journal.len());
        body.push_str(
            "<tr><th>Id</th><th>Address</th><th>Amount</th><th>Started</th><th>State</th><th></th></tr>\n",
        );
        for entry in journal {
            let state = match &entry.state {
                SendState::Pending => "pending".to_string(),
                SendState::Sent { tx_hash, .. } => format!("sent ({})", escape_html(tx_hash)),
                SendState::Unresolved => "unresolved".to_string(),
            };
            let action = match entry.state {
                SendState::Unresolved => format!(
                    "<form method=\"post\" action=\"/admin/journal/{}/resolve\"><button>Resolve</button></form>",
                    entry.id
                ),
                _ => String::new(),
            };
            let started = DateTime::from_timestamp_millis(entry.created_at).unwrap_or_default();
            let _ = writeln!(
                body,
                "<tr><td>{}</td><td><code>{}</code></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                entry.id,
                escape_html(&entry.address),
                self.amount(entry.amount),
                http_date(started),
                state,
                action
            );
        }
        body.push_str("</table>\n");

        self.layout("Admin", &body)
    }
}

fn truncate_address(address: &str) -> String {
    let head: String = address.chars().take(COOLDOWN_ADDRESS_CHARS).collect();
    format!("{}...", head)
}

/// Minimal page for errors raised outside a handler that has the layout
pub fn bare_error(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Error</title></head>\n\
         <body>\n<h2>Error</h2>\n<p class=\"error\">{}</p>\n<p><a href=\"/\">Back</a></p>\n</body>\n</html>\n",
        escape_html(message)
    )
}
