// DANS : src/pipeline.rs

use crate::filtering::PoolCandidate;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Les détails d'une transaction de création de pool : la paire de mints.
/// Produit par le fetcher, jamais modifié ensuite, jeté en fin de run.
#[derive(Debug, Clone)]
pub struct TransactionDetails {
    /// Le mint natif (SOL wrappé), jambe d'entrée du swap.
    pub base_mint: String,
    /// Le mint du token fraîchement créé.
    pub token_mint: String,
    pub observed_at: DateTime<Utc>,
}

/// Le verdict du rug check, consommé une seule fois par l'étape de risque.
#[derive(Debug, Clone)]
pub struct RiskVerdict {
    pub passed: bool,
    pub rating: f64,
    pub warnings: Vec<String>,
}

/// La valeur terminale d'un run du pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub succeeded: bool,
    /// La signature résolvable sur un explorateur, si le swap est parti.
    pub reference: Option<String>,
}

impl SwapOutcome {
    pub fn rejected() -> Self {
        Self { succeeded: false, reference: None }
    }
}

// --- Les trois adaptateurs externes, sous forme de traits pour pouvoir
// --- être remplacés par des mocks dans les tests.

#[async_trait]
pub trait DetailsFetcher: Send + Sync {
    async fn fetch(&self, signature: &str) -> Result<TransactionDetails>;
}

#[async_trait]
pub trait RiskChecker: Send + Sync {
    async fn check(&self, token_mint: &str) -> Result<RiskVerdict>;
}

#[async_trait]
pub trait SwapExecutor: Send + Sync {
    async fn swap(&self, input_mint: &str, output_mint: &str) -> Result<SwapOutcome>;
}

/// Les règles d'éligibilité pures appliquées entre le fetch et le rug check.
#[derive(Debug, Clone)]
pub struct EligibilityRules {
    pub exclude_pump_fun: bool,
    /// Suffixe (comparé en minuscules) identifiant les tokens issus de la
    /// plateforme exclue.
    pub pump_fun_suffix: String,
}

impl EligibilityRules {
    /// Retourne la raison du rejet, ou `None` si le candidat est éligible.
    /// Porte purement synchrone, sans effet de bord.
    pub fn rejection(&self, details: &TransactionDetails) -> Option<String> {
        if details.base_mint.is_empty() || details.token_mint.is_empty() {
            return Some("mint absent des détails de transaction".to_string());
        }
        if self.exclude_pump_fun
            && details
                .token_mint
                .to_lowercase()
                .ends_with(&self.pump_fun_suffix.to_lowercase())
        {
            return Some(format!("token exclu (suffixe '{}')", self.pump_fun_suffix));
        }
        None
    }
}

/// Évalue le rapport du provider de risque contre notre configuration.
/// UNE SEULE condition remplie suffit à rejeter, il n'y a pas d'état
/// de "réussite partielle".
pub fn evaluate_risk(
    success: bool,
    rating: f64,
    warnings: Vec<String>,
    disallowed: &HashSet<String>,
    max_rating: f64,
) -> RiskVerdict {
    let flagged = warnings.iter().any(|warning| disallowed.contains(warning));
    let passed = success && !flagged && rating <= max_rating;
    RiskVerdict { passed, rating, warnings }
}

/// L'orchestrateur de la séquence de décision pour UN candidat :
/// fetch → éligibilité → rug check → exécution, chaque étape coupant
/// court en cas d'échec ou de rejet. Retourne TOUJOURS un `SwapOutcome` :
/// un rejet est un résultat normal, pas une erreur.
pub struct PoolEventPipeline {
    fetcher: Arc<dyn DetailsFetcher>,
    risk_checker: Arc<dyn RiskChecker>,
    executor: Arc<dyn SwapExecutor>,
    eligibility: EligibilityRules,
}

impl PoolEventPipeline {
    pub fn new(
        fetcher: Arc<dyn DetailsFetcher>,
        risk_checker: Arc<dyn RiskChecker>,
        executor: Arc<dyn SwapExecutor>,
        eligibility: EligibilityRules,
    ) -> Self {
        Self { fetcher, risk_checker, executor, eligibility }
    }

    pub async fn run(&self, candidate: PoolCandidate) -> SwapOutcome {
        let signature = candidate.signature;

        // --- Étape 1 : fetch des détails ---
        let details = match self.fetcher.fetch(&signature).await {
            Ok(details) => details,
            Err(error) => {
                // Un fetch raté est un événement SAUTÉ, pas une erreur système.
                warn!(signature = %signature, error = %error, "détails indisponibles, candidat ignoré");
                return SwapOutcome::rejected();
            }
        };
        info!(
            signature = %signature,
            token_mint = %details.token_mint,
            observed_at = %details.observed_at,
            "nouveau pool détecté"
        );

        // --- Étape 2 : éligibilité (porte pure) ---
        if let Some(reason) = self.eligibility.rejection(&details) {
            info!(signature = %signature, token_mint = %details.token_mint, reason = %reason, "candidat inéligible");
            return SwapOutcome::rejected();
        }

        // --- Étape 3 : rug check ---
        match self.risk_checker.check(&details.token_mint).await {
            Ok(verdict) if verdict.passed => {
                info!(token_mint = %details.token_mint, rating = verdict.rating, "rug check passé");
            }
            Ok(verdict) => {
                info!(
                    token_mint = %details.token_mint,
                    rating = verdict.rating,
                    warnings = ?verdict.warnings,
                    "candidat rejeté par le rug check"
                );
                return SwapOutcome::rejected();
            }
            Err(error) => {
                warn!(token_mint = %details.token_mint, error = %error, "rug check indisponible, candidat ignoré");
                return SwapOutcome::rejected();
            }
        }

        // --- Étape 4 : exécution du swap ---
        match self.executor.swap(&details.base_mint, &details.token_mint).await {
            Ok(outcome) => {
                if let Some(reference) = &outcome.reference {
                    info!(token_mint = %details.token_mint, reference = %reference, "swap exécuté");
                }
                outcome
            }
            Err(error) => {
                warn!(token_mint = %details.token_mint, error = %error, "échec du swap");
                SwapOutcome::rejected()
            }
        }
    }
}
