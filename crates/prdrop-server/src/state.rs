use std::sync::Arc;

use prdrop_ledger::AnyLedger;
use prdrop_proofs::AnyBackend;
use prdrop_sdk::{AllowList, ClaimProtocol};

/// Claim protocol as assembled by the server.
pub type ServerProtocol = ClaimProtocol<AnyBackend, AllowList, AnyLedger>;

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    protocol: Arc<ServerProtocol>,
}

impl AppState {
    /// Share `protocol` across handlers.
    #[must_use]
    pub fn new(protocol: ServerProtocol) -> Self {
        Self {
            protocol: Arc::new(protocol),
        }
    }

    /// The claim protocol.
    #[must_use]
    pub fn protocol(&self) -> &ServerProtocol {
        &self.protocol
    }
}
