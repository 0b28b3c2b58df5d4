use std::collections::HashMap;
use std::collections::hash_map::Entry;

use prdrop_core::field::FIELD_ELEMENT_SIZE;
use prdrop_core::public_inputs::Nullifier;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{ClaimLedger, ClaimRecord, LedgerError, Recorded};

/// In-memory ledger. Emptied on restart, so only fit for trial deployments.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    claims: Mutex<HashMap<[u8; FIELD_ELEMENT_SIZE], ClaimRecord>>,
}

impl ClaimLedger for MemoryLedger {
    async fn check_and_record(&self, nullifier: &Nullifier) -> Result<Recorded, LedgerError> {
        let mut claims = self.claims.lock().await;
        match claims.entry(nullifier.to_bytes()) {
            Entry::Occupied(_) => Ok(Recorded::AlreadyClaimed),
            Entry::Vacant(slot) => {
                let record = slot.insert(ClaimRecord::now(nullifier)).clone();
                debug!(%nullifier, "Claim recorded in memory");
                Ok(Recorded::Accepted(record))
            }
        }
    }

    async fn claim_count(&self) -> usize {
        self.claims.lock().await.len()
    }
}
