// DANS : src/rpc/resilient_client.rs

use anyhow::{Context, Result};
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;

/// Un "wrapper" autour du RpcClient de Solana qui ajoute une logique de
/// ré-essai automatique pour les appels qui échouent à cause d'erreurs
/// réseau temporaires. Nombre de tentatives et délai FIXES.
#[derive(Clone)]
pub struct ResilientRpcClient {
    client: Arc<RpcClient>,
    max_retries: u8,
    retry_delay: Duration,
}

impl ResilientRpcClient {
    pub fn new(rpc_url: String, max_retries: u8, retry_delay: Duration) -> Self {
        Self {
            client: Arc::new(RpcClient::new(rpc_url)),
            max_retries,
            retry_delay,
        }
    }

    /// Détermine si une erreur du client est temporaire et si une nouvelle
    /// tentative doit être effectuée.
    fn is_retryable(error: &ClientError) -> bool {
        matches!(
            error.kind,
            ClientErrorKind::Reqwest(_) | ClientErrorKind::RpcError(_) | ClientErrorKind::Io(_)
        )
    }

    /// Soumet une transaction brute déjà signée. Le preflight est sauté :
    /// sur un pool qui vient de naître, la simulation échoue plus souvent
    /// qu'elle ne protège.
    pub async fn send_transaction(&self, transaction: &VersionedTransaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..RpcSendTransactionConfig::default()
        };
        for attempt in 0..=self.max_retries {
            match self
                .client
                .send_transaction_with_config(transaction, config.clone())
                .await
            {
                Ok(signature) => return Ok(signature),
                Err(e) => {
                    if Self::is_retryable(&e) && attempt < self.max_retries {
                        sleep(self.retry_delay).await;
                    } else {
                        return Err(e).with_context(|| {
                            format!("échec final de send_transaction après {} tentative(s)", attempt + 1)
                        });
                    }
                }
            }
        }
        unreachable!()
    }
}
