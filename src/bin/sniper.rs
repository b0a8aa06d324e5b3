// src/bin/sniper.rs

use anyhow::{Context, Result};
use sniper::{
    config::Config,
    data_pipeline::api_connectors::{jupiter::JupiterClient, rugcheck::RugcheckClient},
    data_pipeline::tx_details::RpcDetailsFetcher,
    execution::JupiterSwapper,
    monitoring::logging,
    pipeline::{EligibilityRules, PoolEventPipeline},
    rpc::ResilientRpcClient,
    watcher::Watcher,
};
use solana_sdk::signature::Signer;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Une configuration invalide est la SEULE erreur fatale : on sort
    // avec un code non nul avant même de démarrer la boucle.
    let config = Config::load().context("configuration invalide, arrêt")?;
    logging::setup_logging();

    let retry_policy = config.retry_policy();
    let keypair = config.keypair()?;

    info!(
        wallet = %keypair.pubkey(),
        program = %config.raydium_program_id,
        amount_lamports = config.swap_amount_lamports,
        slippage_bps = config.slippage_bps,
        exclude_pump_fun = config.exclude_pump_fun,
        dry_run = config.dry_run,
        "démarrage du sniper"
    );

    let fetcher = Arc::new(RpcDetailsFetcher::new(
        config.rpc_http_url.clone(),
        config.native_mint.clone(),
        retry_policy.http_timeout,
    )?);

    let risk_checker = Arc::new(RugcheckClient::new(
        config.risk_api_url.clone(),
        config.disallowed_warnings.clone(),
        config.max_holder_rating,
        retry_policy.http_timeout,
    )?);

    let rpc_client = Arc::new(ResilientRpcClient::new(
        config.rpc_http_url.clone(),
        retry_policy.send_transaction_retries,
        retry_policy.send_retry_delay,
    ));
    let jupiter = JupiterClient::new(config.quote_api_url.clone(), retry_policy.http_timeout)?;
    let executor = Arc::new(JupiterSwapper::new(
        jupiter,
        rpc_client,
        keypair,
        config.swap_amount_lamports,
        config.slippage_bps,
        config.dry_run,
    ));

    let pipeline = PoolEventPipeline::new(
        fetcher,
        risk_checker,
        executor,
        EligibilityRules {
            exclude_pump_fun: config.exclude_pump_fun,
            pump_fun_suffix: config.pump_fun_suffix.clone(),
        },
    );

    let mut watcher = Watcher::new(
        config.rpc_ws_url.clone(),
        config.raydium_program_id.clone(),
        retry_policy.reconnect_delay,
        pipeline,
    );

    // Ne retourne jamais en fonctionnement normal.
    watcher.run().await
}
