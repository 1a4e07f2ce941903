//! Faucet service binary

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use xenium_common::utils::logging::init_logging;
use xenium_faucet::wallet::OpenWallet;
use xenium_faucet::{
    router, status_channel, AppState, CaptchaVerifier, FaucetConfig, FaucetService, Reconciler,
    RecaptchaVerifier, StatusPoller, WalletApiClient, WalletGateway,
};
use xenium_storage::Ledgers;

/// Faucet service CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, env = "FAUCET_CONFIG")]
    config: Option<PathBuf>,

    /// Server address
    #[arg(long)]
    server_addr: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FaucetConfig::load(args.config.as_deref())?;
    if let Some(addr) = args.server_addr {
        config.server.addr = addr;
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    }

    let _log_guard = init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("Starting Xenium Faucet v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Server address: {}", config.server.addr);
    info!("  Wallet API: {}", config.wallet.base_url());
    info!(
        "  Payout: {} to {} atomic units every {}ms",
        config.faucet.min_payout, config.faucet.max_payout, config.faucet.claimable_every_ms
    );
    info!("  Captcha: {}", if config.captcha.enabled { "enabled" } else { "disabled" });

    let config = Arc::new(config);

    let ledgers = Ledgers::open(&config.storage.addresses_path, &config.storage.transactions_path)
        .context("failed to open ledgers")?;
    info!(
        "Ledgers opened: {} addresses, {} transactions, {} journal entries",
        ledgers.claims.len(),
        ledgers.transactions.len(),
        ledgers.journal.len()
    );

    let wallet: Arc<dyn WalletGateway> = Arc::new(WalletApiClient::new(&config.wallet)?);
    if config.wallet.open_wallet {
        if let Err(e) = wallet.open(&OpenWallet::from(&config.wallet)).await {
            error!("Could not open wallet {}: {}", config.wallet.wallet_file, e);
            return Err(e).context("failed to open wallet");
        }
        info!("Wallet {} opened", config.wallet.wallet_file);
    }
    let faucet_address = match wallet.primary_address().await {
        Ok(address) => address,
        Err(e) => {
            error!("Could not fetch the faucet address: {}", e);
            return Err(e).context("failed to fetch primary address");
        }
    };
    info!("Faucet address: {}", faucet_address);

    let captcha: Option<Arc<dyn CaptchaVerifier>> = if config.captcha.enabled {
        Some(Arc::new(RecaptchaVerifier::new(&config.captcha)?))
    } else {
        None
    };

    let service = Arc::new(FaucetService::new(
        config.clone(),
        ledgers.clone(),
        wallet.clone(),
        captcha,
        faucet_address,
    )?);
    if let Err(e) = service.log_balance().await {
        warn!("Could not fetch the wallet balance: {}", e);
    }
    info!("Faucet service initialized");

    // Anything left in the journal is from a previous run
    let reconciler = Reconciler::new(ledgers.clone());
    let startup_now = chrono::Utc::now().timestamp_millis();
    reconciler
        .sweep(startup_now, Duration::ZERO)
        .await
        .context("failed to reconcile the send journal")?;
    let reconcile_task = tokio::spawn(reconciler.run(
        config.poller.reconcile_interval(),
        config.poller.in_flight_grace(),
    ));

    let (publisher, status) = status_channel();
    let poller = StatusPoller::new(
        wallet,
        ledgers.claims.clone(),
        ledgers.transactions.clone(),
        config.wallet.decimal_places,
        config.poller.interval(),
        publisher,
    );
    let poller_task = tokio::spawn(poller.run());

    let app = router(AppState::new(service, status));
    if config.server.cors_enabled {
        info!("CORS enabled");
    }

    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("invalid server address {}", config.server.addr))?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down gracefully");
    poller_task.abort();
    reconcile_task.abort();
    ledgers.flush().await.context("failed to flush ledgers")?;
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
