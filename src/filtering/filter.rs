// DANS : src/filtering/filter.rs

use super::{PoolCandidate, StreamFrame, StreamMessage};
use serde_json::Value;
use tracing::debug;

/// Le marqueur émis par Raydium AMM V4 quand une instruction d'initialisation
/// de pool s'exécute. La détection est un test de sous-chaîne EXACT, sensible
/// à la casse : pas de correspondance partielle.
pub const POOL_CREATION_MARKER: &str = "initialize2: InitializeInstruction2";

/// Le filtre d'événements : un prédicat pur sur un `StreamMessage`.
/// Sans effet de bord, il peut être appliqué à chaque message entrant
/// sans pré-filtrage en amont.
pub struct EventFilter;

impl EventFilter {
    /// Décode une frame texte du WebSocket en frame étiquetée.
    ///
    /// Les réponses à `logsSubscribe` portent un `id` : un `result` numérique
    /// est l'accusé de réception, un champ `error` est un REFUS du provider
    /// — ce dernier doit remonter au watcher (c'est une erreur de transport,
    /// pas une frame à ignorer). Tout le reste (JSON invalide, `logs` qui
    /// n'est pas une séquence de chaînes, `signature` absente, méthode non
    /// pertinente) est écarté silencieusement et n'affecte jamais l'état de
    /// la connexion.
    pub fn decode_frame(text: &str) -> StreamFrame {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(error) => {
                debug!(error = %error, "frame non-JSON écartée");
                return StreamFrame::Irrelevant;
            }
        };

        if let Some(id) = value.get("id") {
            if let Some(error) = value.get("error") {
                let reason = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("erreur non décrite")
                    .to_string();
                return StreamFrame::SubscriptionError(reason);
            }
            if let Some(result) = value.get("result") {
                if id.is_number() && result.is_number() {
                    debug!(id = ?id, subscription = ?result, "abonnement logsSubscribe confirmé");
                    return StreamFrame::Ack;
                }
            }
            return StreamFrame::Irrelevant;
        }

        let Some("logsNotification") = value.get("method").and_then(Value::as_str) else {
            return StreamFrame::Irrelevant;
        };

        let Some(event) = value
            .get("params")
            .and_then(|params| params.get("result"))
            .and_then(|result| result.get("value"))
        else {
            return StreamFrame::Irrelevant;
        };

        let Some(signature) = event.get("signature").and_then(Value::as_str) else {
            return StreamFrame::Irrelevant;
        };
        let Some(raw_logs) = event.get("logs").and_then(Value::as_array) else {
            return StreamFrame::Irrelevant;
        };
        let mut logs = Vec::with_capacity(raw_logs.len());
        for entry in raw_logs {
            // Un seul élément non-chaîne invalide toute la séquence.
            let Some(line) = entry.as_str() else {
                return StreamFrame::Irrelevant;
            };
            logs.push(line.to_string());
        }
        let is_failed = event.get("err").map(|err| !err.is_null()).unwrap_or(false);

        StreamFrame::Message(StreamMessage {
            signature: signature.to_string(),
            logs,
            is_failed,
        })
    }

    /// Le prédicat central : accepte le message si et seulement si une ligne
    /// de log contient le marqueur d'initialisation de pool.
    pub fn classify(message: &StreamMessage) -> Option<PoolCandidate> {
        if message.is_failed {
            return None;
        }
        if message.logs.iter().any(|line| line.contains(POOL_CREATION_MARKER)) {
            return Some(PoolCandidate { signature: message.signature.clone() });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(signature: &str, logs: serde_json::Value, err: serde_json::Value) -> String {
        json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "subscription": 42,
                "result": {
                    "context": { "slot": 1234 },
                    "value": { "signature": signature, "logs": logs, "err": err }
                }
            }
        })
        .to_string()
    }

    fn classify_text(text: &str) -> Option<PoolCandidate> {
        match EventFilter::decode_frame(text) {
            StreamFrame::Message(message) => EventFilter::classify(&message),
            _ => None,
        }
    }

    #[test]
    fn accepts_message_with_initialization_marker() {
        let frame = notification(
            "SIG1",
            json!(["Program log: initialize2: InitializeInstruction2"]),
            json!(null),
        );
        let candidate = classify_text(&frame).unwrap();
        assert_eq!(candidate.signature, "SIG1");
    }

    #[test]
    fn rejects_message_without_marker() {
        let frame = notification(
            "SIG2",
            json!(["Program log: swap", "Program log: transfer"]),
            json!(null),
        );
        assert!(classify_text(&frame).is_none());
    }

    #[test]
    fn marker_match_is_exact_substring() {
        // Pas de correspondance partielle ni insensible à la casse.
        let frame = notification(
            "SIG3",
            json!(["Program log: INITIALIZE2: initializeinstruction2"]),
            json!(null),
        );
        assert!(classify_text(&frame).is_none());
    }

    #[test]
    fn rejects_failed_transactions() {
        let frame = notification(
            "SIG4",
            json!(["Program log: initialize2: InitializeInstruction2"]),
            json!({"InstructionError": [2, "Custom"]}),
        );
        assert!(classify_text(&frame).is_none());
    }

    #[test]
    fn rejects_non_string_log_entries() {
        let frame = notification("SIG5", json!(["ok", 7, "initialize2: InitializeInstruction2"]), json!(null));
        assert_eq!(EventFilter::decode_frame(&frame), StreamFrame::Irrelevant);
    }

    #[test]
    fn rejects_missing_signature() {
        let frame = json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": { "result": { "value": { "logs": ["initialize2: InitializeInstruction2"] } } }
        })
        .to_string();
        assert_eq!(EventFilter::decode_frame(&frame), StreamFrame::Irrelevant);
    }

    #[test]
    fn subscription_ack_is_not_a_message() {
        let ack = json!({"jsonrpc": "2.0", "id": 1, "result": 23784}).to_string();
        assert_eq!(EventFilter::decode_frame(&ack), StreamFrame::Ack);
    }

    #[test]
    fn subscription_refusal_is_surfaced_not_swallowed() {
        let refusal = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32602, "message": "Invalid params" }
        })
        .to_string();
        assert_eq!(
            EventFilter::decode_frame(&refusal),
            StreamFrame::SubscriptionError("Invalid params".to_string())
        );
    }

    #[test]
    fn subscription_refusal_without_message_still_surfaces() {
        let refusal = json!({"jsonrpc": "2.0", "id": 1, "error": {}}).to_string();
        assert_eq!(
            EventFilter::decode_frame(&refusal),
            StreamFrame::SubscriptionError("erreur non décrite".to_string())
        );
    }

    #[test]
    fn garbage_frame_is_discarded_silently() {
        assert_eq!(EventFilter::decode_frame("pas du json"), StreamFrame::Irrelevant);
        assert_eq!(
            EventFilter::decode_frame("{\"method\":\"autre\"}"),
            StreamFrame::Irrelevant
        );
    }
}
