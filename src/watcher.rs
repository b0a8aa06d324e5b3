// DANS : src/watcher.rs

use crate::filtering::{EventFilter, PoolCandidate, StreamFrame};
use crate::pipeline::PoolEventPipeline;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Une connexion muette pendant ce laps de temps est considérée morte
/// et déclenche une reconnexion.
const WS_IDLE_TIMEOUT_SECS: u64 = 120;

/// L'état de l'unique connexion d'abonnement, possédé exclusivement
/// par le `Watcher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Subscribed,
    ProcessingEvent,
    Closing,
}

/// L'issue d'un tour de la machine à états, qui dicte le timing de la
/// reconnexion dans `run`.
#[derive(Debug, PartialEq, Eq)]
enum CycleOutcome {
    /// Un candidat a été traité jusqu'au bout : reconnexion immédiate.
    Processed,
    /// Transport perdu (connexion, abonnement refusé, flux mort) :
    /// reconnexion après le délai fixe.
    TransportLost,
}

// --- La requête `logsSubscribe`, construite une fois par tentative de
// --- connexion. Le tuple `params` se sérialise en tableau JSON hétérogène.

#[derive(Debug, Serialize)]
struct MentionsFilter {
    mentions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CommitmentFilter {
    commitment: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (MentionsFilter, CommitmentFilter),
}

impl SubscriptionRequest {
    pub fn new(id: u64, program_id: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method: "logsSubscribe",
            params: (
                MentionsFilter { mentions: vec![program_id.to_string()] },
                // "processed" : le niveau le moins confirmé, le plus rapide.
                CommitmentFilter { commitment: "processed" },
            ),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("sérialisation de la requête logsSubscribe")
    }
}

/// Le gestionnaire de connexion : une boucle de reconnexion EXPLICITE
/// (pas de handler qui se rappelle lui-même) pilotant la machine à états.
///
/// Cycle nominal : Connecting → Subscribed → (match du filtre) →
/// fermeture normale du transport → ProcessingEvent → pipeline →
/// Connecting. La fermeture du transport AVANT le pipeline garantit
/// qu'au plus un candidat est en vol à tout instant : la seule source
/// de candidats est l'abonnement lui-même.
pub struct Watcher {
    ws_url: String,
    program_id: String,
    reconnect_delay: Duration,
    pipeline: PoolEventPipeline,
    state: ConnectionState,
    request_id: u64,
}

impl Watcher {
    pub fn new(
        ws_url: String,
        program_id: String,
        reconnect_delay: Duration,
        pipeline: PoolEventPipeline,
    ) -> Self {
        Self {
            ws_url,
            program_id,
            reconnect_delay,
            pipeline,
            state: ConnectionState::Disconnected,
            request_id: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Démarre la boucle de surveillance. Ne retourne jamais en
    /// fonctionnement normal : toute erreur de transport est absorbée par
    /// une reconnexion, et l'issue du pipeline (succès, rejet ou erreur)
    /// ne termine jamais le processus.
    pub async fn run(&mut self) -> Result<()> {
        info!(ws_url = %self.ws_url, program = %self.program_id, "démarrage de la boucle de surveillance");
        loop {
            match self.cycle().await {
                // L'issue du pipeline n'influe pas sur la boucle : retour
                // immédiat à l'écoute.
                CycleOutcome::Processed => {}
                // Délai fixe, pas de backoff exponentiel, par choix.
                CycleOutcome::TransportLost => time::sleep(self.reconnect_delay).await,
            }
        }
    }

    /// Un tour complet de la machine à états : connexion, abonnement,
    /// écoute jusqu'au premier candidat ou jusqu'à la mort du transport,
    /// et traitement éventuel du candidat.
    async fn cycle(&mut self) -> CycleOutcome {
        self.state = ConnectionState::Connecting;
        let mut ws = match self.connect_and_subscribe().await {
            Ok(ws) => ws,
            Err(error) => {
                warn!(error = %error, "connexion impossible, nouvelle tentative programmée");
                self.state = ConnectionState::Disconnected;
                return CycleOutcome::TransportLost;
            }
        };

        self.state = ConnectionState::Subscribed;
        info!(program = %self.program_id, "abonnement actif, en attente d'événements");

        match self.listen(&mut ws).await {
            Some(candidate) => {
                // On ferme le transport AVANT de lancer le pipeline :
                // aucun message ultérieur ne peut produire un second
                // candidat concurrent.
                self.state = ConnectionState::Closing;
                let close_frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "candidat accepté".into(),
                };
                if let Err(error) = ws.close(Some(close_frame)).await {
                    debug!(error = %error, "fermeture du WebSocket déjà effective");
                }

                self.state = ConnectionState::ProcessingEvent;
                let signature = candidate.signature.clone();
                let outcome = self.pipeline.run(candidate).await;
                info!(
                    signature = %signature,
                    succeeded = outcome.succeeded,
                    reference = outcome.reference.as_deref().unwrap_or("-"),
                    "pipeline terminé, retour à l'écoute"
                );
                CycleOutcome::Processed
            }
            None => {
                self.state = ConnectionState::Disconnected;
                CycleOutcome::TransportLost
            }
        }
    }

    async fn connect_and_subscribe(&mut self) -> Result<WsStream> {
        let (mut ws, _) = connect_async(self.ws_url.as_str())
            .await
            .with_context(|| format!("connexion WebSocket à {}", self.ws_url))?;

        self.request_id += 1;
        let request = SubscriptionRequest::new(self.request_id, &self.program_id);
        ws.send(Message::Text(request.to_json()?.into()))
            .await
            .context("envoi de la requête logsSubscribe")?;

        Ok(ws)
    }

    /// Lit le flux jusqu'au premier candidat accepté (`Some`) ou jusqu'à la
    /// mort de la connexion (`None`) — y compris un refus d'abonnement par
    /// le provider. Les frames malformées sont écartées sans toucher à
    /// l'état de la connexion.
    async fn listen(&mut self, ws: &mut WsStream) -> Option<PoolCandidate> {
        loop {
            let next = time::timeout(Duration::from_secs(WS_IDLE_TIMEOUT_SECS), ws.next()).await;
            match next {
                Err(_) => {
                    warn!("flux silencieux trop longtemps, reconnexion");
                    return None;
                }
                Ok(None) => {
                    warn!("flux WebSocket terminé par le serveur");
                    return None;
                }
                Ok(Some(Err(error))) => {
                    warn!(error = %error, "erreur de transport sur l'abonnement");
                    return None;
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    match EventFilter::decode_frame(text.as_str()) {
                        StreamFrame::Message(message) => {
                            if let Some(candidate) = EventFilter::classify(&message) {
                                info!(signature = %candidate.signature, "événement de création de pool accepté");
                                return Some(candidate);
                            }
                        }
                        StreamFrame::SubscriptionError(reason) => {
                            warn!(reason = %reason, "abonnement refusé par le provider");
                            return None;
                        }
                        StreamFrame::Ack | StreamFrame::Irrelevant => {}
                    }
                }
                Ok(Some(Ok(Message::Ping(payload)))) => {
                    if let Err(error) = ws.send(Message::Pong(payload)).await {
                        warn!(error = %error, "envoi du pong impossible");
                        return None;
                    }
                }
                Ok(Some(Ok(Message::Close(frame)))) => {
                    let code = frame.as_ref().map(|f| f.code);
                    warn!(code = ?code, "fermeture reçue du serveur");
                    return None;
                }
                Ok(Some(Ok(_))) => {
                    // Binaire / Pong : rien à faire.
                }
            }
        }
    }
}
