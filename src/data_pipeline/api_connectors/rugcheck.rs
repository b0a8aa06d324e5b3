// DANS : src/data_pipeline/api_connectors/rugcheck.rs

use crate::pipeline::{evaluate_risk, RiskChecker, RiskVerdict};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

// --- Structures pour la réponse du rapport de risque ---

#[derive(Debug, Deserialize)]
pub struct RiskReportResponse {
    pub success: bool,
    pub data: RiskReportData,
}

#[derive(Debug, Deserialize)]
pub struct RiskReportData {
    /// Score de concentration de détention (plus c'est haut, pire c'est).
    pub rating: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// L'adaptateur du rug check : un appel HTTP keyed par le mint du token,
/// dont le rapport est confronté à la liste de warnings interdits et au
/// plafond de rating configurés.
pub struct RugcheckClient {
    client: reqwest::Client,
    base_url: String,
    disallowed_warnings: HashSet<String>,
    max_rating: f64,
}

impl RugcheckClient {
    pub fn new(
        base_url: String,
        disallowed_warnings: Vec<String>,
        max_rating: f64,
        http_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(http_timeout)
            .build()
            .context("construction du client HTTP du rug check")?;
        Ok(Self {
            client,
            base_url,
            disallowed_warnings: disallowed_warnings.into_iter().collect(),
            max_rating,
        })
    }
}

#[async_trait]
impl RiskChecker for RugcheckClient {
    async fn check(&self, token_mint: &str) -> Result<RiskVerdict> {
        let url = format!("{}/tokens/{}/report/summary", self.base_url, token_mint);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("erreur API rug check: {} - {}", status, error_body));
        }

        let response_text = response.text().await?;
        let report: RiskReportResponse = serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("décodage du rapport de risque: {}. Réponse reçue: {}", e, response_text))?;

        Ok(evaluate_risk(
            report.success,
            report.data.rating,
            report.data.warnings,
            &self.disallowed_warnings,
            self.max_rating,
        ))
    }
}
