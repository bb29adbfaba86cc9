//! Database seeder for Centime development and testing.
//!
//! Provisions the platform operator's wallet hierarchy and a funded demo
//! client so the ledger can be exercised against a fresh database.
//!
//! Usage: cargo run --bin seeder

use centime_core::wallet::WalletKind;
use centime_db::repositories::{PropagationOrchestrator, WalletRepository};
use centime_shared::{AppConfig, Currency};
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Demo client owner id (consistent for all seeds).
const DEMO_CLIENT_ID: &str = "00000000-0000-0000-0000-000000000002";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "centime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    info!("Connecting to database");
    let db = centime_db::connect(&config.database.url).await?;

    let currency: Currency = config
        .ledger
        .default_currency
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let wallets = WalletRepository::new(db.clone());

    info!(platform_owner_id = %config.ledger.platform_owner_id, "Provisioning platform wallets");
    let provisioned = wallets
        .provision_owner(config.ledger.platform_owner_id, true, currency)
        .await?;
    info!(count = provisioned.len(), "Platform hierarchy ready");

    let demo_client = Uuid::parse_str(DEMO_CLIENT_ID)?;
    info!(%demo_client, "Provisioning demo client");
    wallets.provision_owner(demo_client, false, currency).await?;

    // Fund the demo client only once; re-running the seeder must not stack
    // balances.
    let balance = wallets
        .get_balance(demo_client, WalletKind::General)
        .await?;
    if balance.is_zero() {
        let orchestrator =
            PropagationOrchestrator::new(db.clone(), config.ledger.platform_owner_id);
        orchestrator
            .record_incoming_payment(demo_client, dec!(100.00), "pay_seed_demo")
            .await?;
        info!("Funded demo client with 100.00");
    } else {
        info!(balance = %balance, "Demo client already funded, skipping");
    }

    info!("Seeding complete");
    Ok(())
}
