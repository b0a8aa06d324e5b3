// DANS : src/filtering/mod.rs

pub mod filter;

pub use filter::{EventFilter, POOL_CREATION_MARKER};

/// Une frame du WebSocket d'abonnement, étiquetée au décodage. Seule la
/// variante `SubscriptionError` change le comportement du watcher : le
/// provider a refusé `logsSubscribe`, il faut reconnecter tout de suite au
/// lieu d'attendre un flux qui ne viendra jamais.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Une notification de logs bien formée.
    Message(StreamMessage),
    /// L'accusé de réception de l'abonnement.
    Ack,
    /// Le provider a répondu par une erreur à la requête d'abonnement.
    SubscriptionError(String),
    /// Frame malformée ou méthode non pertinente : écartée sans effet.
    Irrelevant,
}

/// Un message du flux `logsSubscribe`, réduit aux seuls champs qui nous
/// intéressent. Tout le reste de la notification est ignoré au décodage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// La signature de la transaction qui a produit ces logs.
    pub signature: String,
    /// Les lignes de log du programme, dans l'ordre d'émission.
    pub logs: Vec<String>,
    /// true si la transaction a échoué on-chain (`err` non nul) : une
    /// transaction échouée ne peut pas avoir créé de pool.
    pub is_failed: bool,
}

/// L'unité minimale transmise du watcher au pipeline : la signature de la
/// transaction qui a initialisé un pool. Créée au moment où le filtre
/// accepte un message, consommée exactement une fois.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolCandidate {
    pub signature: String,
}
