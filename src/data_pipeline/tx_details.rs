// DANS : src/data_pipeline/tx_details.rs

use crate::pipeline::{DetailsFetcher, TransactionDetails};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

// --- Structures pour la réponse `getTransaction` (champs utiles uniquement) ---

#[derive(Debug, Deserialize)]
struct GetTransactionResponse {
    result: Option<TransactionEnvelope>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    meta: Option<TransactionMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMeta {
    #[serde(default)]
    post_token_balances: Vec<TokenBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalance {
    mint: String,
}

/// Règle de dérivation du mint du token : le PREMIER mint des soldes
/// post-transaction qui n'est pas le mint natif. Une liste vide ou
/// uniquement native est un échec du fetch, pas un candidat "à moitié".
fn derive_token_mint(balances: &[TokenBalance], native_mint: &str) -> Option<String> {
    balances
        .iter()
        .map(|balance| balance.mint.as_str())
        .find(|mint| *mint != native_mint)
        .map(ToString::to_string)
}

/// Récupère les détails d'une transaction de création de pool via un appel
/// JSON-RPC `getTransaction` keyed par la signature.
pub struct RpcDetailsFetcher {
    client: reqwest::Client,
    rpc_url: String,
    native_mint: String,
}

impl RpcDetailsFetcher {
    pub fn new(rpc_url: String, native_mint: String, http_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .context("construction du client HTTP du fetcher")?;
        Ok(Self { client, rpc_url, native_mint })
    }
}

#[async_trait]
impl DetailsFetcher for RpcDetailsFetcher {
    async fn fetch(&self, signature: &str) -> Result<TransactionDetails> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getTransaction",
            "params": [
                signature,
                {
                    "encoding": "jsonParsed",
                    "maxSupportedTransactionVersion": 0,
                    "commitment": "confirmed"
                }
            ]
        });

        let response = self.client.post(&self.rpc_url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("erreur RPC getTransaction: {} - {}", status, error_body));
        }

        let response_text = response.text().await?;
        let decoded: GetTransactionResponse = serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("décodage getTransaction: {}. Réponse reçue: {}", e, response_text))?;

        if let Some(error) = decoded.error {
            return Err(anyhow!("getTransaction a échoué ({}): {}", error.code, error.message));
        }
        let envelope = decoded
            .result
            .ok_or_else(|| anyhow!("transaction {} absente de la réponse RPC", signature))?;
        let meta = envelope
            .meta
            .ok_or_else(|| anyhow!("transaction {} sans métadonnées", signature))?;

        let token_mint = derive_token_mint(&meta.post_token_balances, &self.native_mint)
            .ok_or_else(|| anyhow!("aucun mint non-natif dans la transaction {}", signature))?;

        Ok(TransactionDetails {
            base_mint: self.native_mint.clone(),
            token_mint,
            observed_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATIVE: &str = "So11111111111111111111111111111111111111112";

    fn balances(mints: &[&str]) -> Vec<TokenBalance> {
        mints.iter().map(|mint| TokenBalance { mint: mint.to_string() }).collect()
    }

    #[test]
    fn derives_first_non_native_mint() {
        let mint = derive_token_mint(&balances(&[NATIVE, "ABCxyz", "DEFuvw"]), NATIVE);
        assert_eq!(mint.as_deref(), Some("ABCxyz"));
    }

    #[test]
    fn native_only_balances_yield_nothing() {
        assert!(derive_token_mint(&balances(&[NATIVE, NATIVE]), NATIVE).is_none());
        assert!(derive_token_mint(&[], NATIVE).is_none());
    }

    #[test]
    fn decodes_post_token_balances_from_rpc_payload() {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {
                "slot": 1,
                "meta": {
                    "err": null,
                    "postTokenBalances": [
                        { "accountIndex": 4, "mint": NATIVE, "owner": "x" },
                        { "accountIndex": 5, "mint": "ABCxyz", "owner": "y" }
                    ]
                }
            }
        })
        .to_string();
        let decoded: GetTransactionResponse = serde_json::from_str(&payload).unwrap();
        let meta = decoded.result.unwrap().meta.unwrap();
        assert_eq!(
            derive_token_mint(&meta.post_token_balances, NATIVE).as_deref(),
            Some("ABCxyz")
        );
    }

    #[test]
    fn missing_transaction_is_an_error_payload() {
        let payload = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let decoded: GetTransactionResponse = serde_json::from_str(payload).unwrap();
        assert!(decoded.result.is_none());
    }
}
