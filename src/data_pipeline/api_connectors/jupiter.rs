// DANS : src/data_pipeline/api_connectors/jupiter.rs

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::{Value, json};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

/// La réponse de `/swap` : la transaction prête à signer, encodée en base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    pub swap_transaction: String,
}

/// Le connecteur de l'agrégateur de swap : un appel de quote puis un appel
/// de construction de transaction. Le contenu de la quote est opaque pour
/// nous, on le repasse tel quel à `/swap`.
pub struct JupiterClient {
    client: reqwest::Client,
    base_url: String,
}

impl JupiterClient {
    pub fn new(base_url: String, http_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .context("construction du client HTTP Jupiter")?;
        Ok(Self { client, base_url })
    }

    /// Demande une quote pour échanger `amount` unités de `input_mint`
    /// contre `output_mint`, avec la tolérance de slippage configurée.
    pub async fn get_quote(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Value> {
        let url = format!("{}/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", slippage_bps.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("erreur API quote: {} - {}", status, error_body));
        }

        let response_text = response.text().await?;
        let quote: Value = serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("décodage de la quote: {}. Réponse reçue: {}", e, response_text))?;

        if let Some(error) = quote.get("error").and_then(Value::as_str) {
            return Err(anyhow!("la quote a été refusée: {}", error));
        }
        Ok(quote)
    }

    /// Construit la transaction de swap pour le wallet donné à partir d'une
    /// quote obtenue juste avant.
    pub async fn build_swap_transaction(
        &self,
        quote: &Value,
        user_public_key: &Pubkey,
    ) -> Result<SwapResponse> {
        let url = format!("{}/swap", self.base_url);
        let body = json!({
            "quoteResponse": quote,
            "userPublicKey": user_public_key.to_string(),
            "wrapAndUnwrapSol": true,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("erreur API swap: {} - {}", status, error_body));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            anyhow!("décodage de la réponse swap: {}. Réponse reçue: {}", e, response_text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_response_decodes_camel_case_payload() {
        let payload = r#"{"swapTransaction": "AQIDBA==", "lastValidBlockHeight": 123}"#;
        let decoded: SwapResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(decoded.swap_transaction, "AQIDBA==");
    }

    #[test]
    fn quote_error_field_is_detected() {
        let quote: Value = serde_json::from_str(r#"{"error": "No routes found"}"#).unwrap();
        assert_eq!(quote.get("error").and_then(Value::as_str), Some("No routes found"));
    }
}
