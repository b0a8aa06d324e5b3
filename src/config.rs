// src/config.rs

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::str::FromStr;
use std::time::Duration;

/// Programme Raydium AMM V4 : c'est lui qui émet le log d'initialisation
/// de pool que nous surveillons.
fn default_raydium_program_id() -> String {
    "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string()
}

/// Le mint du SOL wrappé, notre jambe "native" dans chaque swap.
fn default_native_mint() -> String {
    "So11111111111111111111111111111111111111112".to_string()
}

fn default_swap_amount_lamports() -> u64 {
    10_000_000 // 0.01 SOL
}

fn default_slippage_bps() -> u16 {
    250
}

fn default_disallowed_warnings() -> Vec<String> {
    vec![
        "Freeze Authority still enabled".to_string(),
        "Large Amount of LP Unlocked".to_string(),
        "Copycat token".to_string(),
    ]
}

fn default_max_holder_rating() -> f64 {
    30_000.0
}

fn default_true() -> bool {
    true
}

fn default_pump_fun_suffix() -> String {
    "pump".to_string()
}

fn default_http_timeout_secs() -> u64 {
    5
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_send_tx_retries() -> u8 {
    3
}

fn default_risk_api_url() -> String {
    "https://api.rugcheck.xyz/v1".to_string()
}

fn default_quote_api_url() -> String {
    "https://quote-api.jup.ag/v6".to_string()
}

/// La configuration complète du processus, chargée UNE SEULE FOIS au
/// démarrage puis passée par référence aux composants. Aucun composant
/// ne relit l'environnement après ce chargement.
#[derive(Deserialize, Debug)]
pub struct Config {
    pub rpc_http_url: String,
    pub rpc_ws_url: String,

    /// Clé privée du wallet en base58 (64 octets). Optionnelle uniquement
    /// en mode dry-run.
    #[serde(default)]
    pub wallet_private_key: String,

    #[serde(default = "default_raydium_program_id")]
    pub raydium_program_id: String,
    #[serde(default = "default_native_mint")]
    pub native_mint: String,

    // --- Paramètres du swap ---
    #[serde(default = "default_swap_amount_lamports")]
    pub swap_amount_lamports: u64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u16,

    // --- Filtres d'éligibilité et de risque ---
    #[serde(default = "default_disallowed_warnings")]
    pub disallowed_warnings: Vec<String>,
    #[serde(default = "default_max_holder_rating")]
    pub max_holder_rating: f64,
    #[serde(default = "default_true")]
    pub exclude_pump_fun: bool,
    #[serde(default = "default_pump_fun_suffix")]
    pub pump_fun_suffix: String,

    // --- Constantes de timing (voir RetryPolicy) ---
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_send_tx_retries")]
    pub send_tx_retries: u8,

    /// Si true, on construit et on signe le swap mais on ne soumet rien.
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_risk_api_url")]
    pub risk_api_url: String,
    #[serde(default = "default_quote_api_url")]
    pub quote_api_url: String,
}

impl Config {
    /// Charge la configuration depuis `.env` / l'environnement et la valide.
    /// Une erreur ici est fatale : le processus s'arrête avant la boucle.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>().context("variables d'environnement invalides")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.program_pubkey()?;
        Pubkey::from_str(&self.native_mint)
            .map_err(|e| anyhow!("NATIVE_MINT invalide ({}): {e}", self.native_mint))?;
        ensure!(self.swap_amount_lamports > 0, "SWAP_AMOUNT_LAMPORTS doit être > 0");
        ensure!(self.slippage_bps > 0, "SLIPPAGE_BPS doit être > 0");
        ensure!(
            !self.pump_fun_suffix.is_empty() || !self.exclude_pump_fun,
            "PUMP_FUN_SUFFIX ne peut pas être vide quand EXCLUDE_PUMP_FUN est actif"
        );
        if !self.dry_run {
            self.keypair()?;
        }
        Ok(())
    }

    pub fn program_pubkey(&self) -> Result<Pubkey> {
        Pubkey::from_str(&self.raydium_program_id).map_err(|e| {
            anyhow!("RAYDIUM_PROGRAM_ID invalide ({}): {e}", self.raydium_program_id)
        })
    }

    /// Décode la clé privée du wallet. En dry-run sans clé fournie, un
    /// keypair éphémère est généré (aucune transaction ne part de toute façon).
    pub fn keypair(&self) -> Result<Keypair> {
        if self.wallet_private_key.is_empty() {
            ensure!(self.dry_run, "WALLET_PRIVATE_KEY est requis hors mode dry-run");
            return Ok(Keypair::new());
        }
        let bytes = bs58::decode(&self.wallet_private_key)
            .into_vec()
            .context("WALLET_PRIVATE_KEY n'est pas du base58 valide")?;
        Keypair::try_from(bytes.as_slice())
            .map_err(|e| anyhow!("WALLET_PRIVATE_KEY n'est pas un keypair valide: {e}"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            send_transaction_retries: self.send_tx_retries,
            send_retry_delay: Duration::from_millis(500),
            reconnect_delay: Duration::from_secs(self.reconnect_delay_secs),
        }
    }
}

/// Les trois boutons de timing du système. Des délais FIXES, sans jitter
/// ni croissance exponentielle : la source d'événements est peu volumineuse
/// et la simplicité prime.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Timeout de chaque appel HTTP sortant (fetch, rug check, quote, swap).
    pub http_timeout: Duration,
    /// Nombre de tentatives de soumission d'une transaction brute.
    pub send_transaction_retries: u8,
    /// Délai entre deux tentatives de soumission.
    pub send_retry_delay: Duration,
    /// Délai avant de rétablir l'abonnement après une déconnexion.
    pub reconnect_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            rpc_http_url: "http://localhost:8899".to_string(),
            rpc_ws_url: "ws://localhost:8900".to_string(),
            wallet_private_key: String::new(),
            raydium_program_id: default_raydium_program_id(),
            native_mint: default_native_mint(),
            swap_amount_lamports: default_swap_amount_lamports(),
            slippage_bps: default_slippage_bps(),
            disallowed_warnings: default_disallowed_warnings(),
            max_holder_rating: default_max_holder_rating(),
            exclude_pump_fun: true,
            pump_fun_suffix: default_pump_fun_suffix(),
            http_timeout_secs: default_http_timeout_secs(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
            send_tx_retries: default_send_tx_retries(),
            dry_run: true,
            risk_api_url: default_risk_api_url(),
            quote_api_url: default_quote_api_url(),
        }
    }

    #[test]
    fn defaults_are_sane() {
        let config = base_config();
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.reconnect_delay_secs, 5);
        assert_eq!(config.send_tx_retries, 3);
        assert_eq!(config.slippage_bps, 250);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_program_id_is_rejected() {
        let mut config = base_config();
        config.raydium_program_id = "pas-une-adresse".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_wallet_key_is_fatal_outside_dry_run() {
        let mut config = base_config();
        config.dry_run = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn dry_run_without_wallet_key_gets_ephemeral_keypair() {
        let config = base_config();
        assert!(config.keypair().is_ok());
    }

    #[test]
    fn wallet_key_roundtrip() {
        use solana_sdk::signature::Signer;
        let keypair = Keypair::new();
        let mut config = base_config();
        config.wallet_private_key = bs58::encode(keypair.to_bytes()).into_string();
        let decoded = config.keypair().unwrap();
        assert_eq!(decoded.pubkey(), keypair.pubkey());
    }

    #[test]
    fn retry_policy_carries_fixed_delays() {
        let policy = base_config().retry_policy();
        assert_eq!(policy.http_timeout, Duration::from_secs(5));
        assert_eq!(policy.reconnect_delay, Duration::from_secs(5));
        assert_eq!(policy.send_transaction_retries, 3);
    }
}
