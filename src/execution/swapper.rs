// DANS : src/execution/swapper.rs

use crate::data_pipeline::api_connectors::jupiter::JupiterClient;
use crate::pipeline::{SwapExecutor, SwapOutcome};
use crate::rpc::ResilientRpcClient;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use solana_sdk::{
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tracing::info;

/// L'exécuteur de swap : quote → construction → signature → soumission.
/// Montant et slippage sont FIXES, chargés une fois depuis la configuration.
pub struct JupiterSwapper {
    jupiter: JupiterClient,
    rpc_client: Arc<ResilientRpcClient>,
    keypair: Keypair,
    amount_lamports: u64,
    slippage_bps: u16,
    dry_run: bool, // Si true, on n'envoie rien, on se contente d'afficher un log.
}

impl JupiterSwapper {
    pub fn new(
        jupiter: JupiterClient,
        rpc_client: Arc<ResilientRpcClient>,
        keypair: Keypair,
        amount_lamports: u64,
        slippage_bps: u16,
        dry_run: bool,
    ) -> Self {
        Self { jupiter, rpc_client, keypair, amount_lamports, slippage_bps, dry_run }
    }
}

#[async_trait]
impl SwapExecutor for JupiterSwapper {
    async fn swap(&self, input_mint: &str, output_mint: &str) -> Result<SwapOutcome> {
        let quote = self
            .jupiter
            .get_quote(input_mint, output_mint, self.amount_lamports, self.slippage_bps)
            .await
            .context("obtention de la quote")?;

        let swap = self
            .jupiter
            .build_swap_transaction(&quote, &self.keypair.pubkey())
            .await
            .context("construction de la transaction de swap")?;

        let transaction_bytes = STANDARD
            .decode(&swap.swap_transaction)
            .context("la transaction de swap n'est pas du base64 valide")?;
        let unsigned: VersionedTransaction = bincode::deserialize(&transaction_bytes)
            .context("désérialisation de la transaction de swap")?;

        // On re-signe la transaction construite par l'agrégateur avec
        // notre propre keypair.
        let signed = VersionedTransaction::try_new(unsigned.message, &[&self.keypair])
            .map_err(|e| anyhow!("signature de la transaction de swap: {e}"))?;

        if self.dry_run {
            let signature = signed.signatures[0];
            info!(
                signature = %signature,
                amount_lamports = self.amount_lamports,
                "[DRY RUN] swap signé mais non soumis"
            );
            return Ok(SwapOutcome { succeeded: true, reference: Some(signature.to_string()) });
        }

        let signature = self
            .rpc_client
            .send_transaction(&signed)
            .await
            .context("soumission de la transaction de swap")?;

        Ok(SwapOutcome { succeeded: true, reference: Some(signature.to_string()) })
    }
}
