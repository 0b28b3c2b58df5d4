//! Nullifier ledger.
//!
//! The ledger is the only shared mutable state of the claim service. It is reached through a
//! single operation, [`ClaimLedger::check_and_record`], which inserts a nullifier if and only if
//! it is absent, in one atomic step. Nothing else reads or writes nullifier state.

mod memory;
mod sled_ledger;

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use prdrop_core::public_inputs::Nullifier;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryLedger;
pub use sled_ledger::SledLedger;

/// Errors raised by a ledger backend.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The durable store failed.
    #[error("claim store error: {0}")]
    Storage(#[from] sled::Error),

    /// A record could not be encoded.
    #[error("claim record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A successful claim. Inserted once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Nullifier of the claimed email.
    pub nullifier: Nullifier,
    /// Unix time of the claim, in seconds.
    pub claimed_at: u64,
}

impl ClaimRecord {
    fn now(nullifier: &Nullifier) -> Self {
        let claimed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self {
            nullifier: nullifier.clone(),
            claimed_at,
        }
    }
}

/// Outcome of [`ClaimLedger::check_and_record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// The nullifier was absent and is now recorded.
    Accepted(ClaimRecord),
    /// The nullifier was already recorded; nothing changed.
    AlreadyClaimed,
}

/// Atomic insert-if-absent store of spent nullifiers.
pub trait ClaimLedger: Send + Sync {
    /// Record `nullifier` unless it is already recorded.
    ///
    /// Of any number of concurrent calls with the same nullifier, exactly one observes
    /// [`Recorded::Accepted`]. `Accepted` is returned only once the record is durable; an error
    /// leaves the nullifier unrecorded.
    fn check_and_record(
        &self,
        nullifier: &Nullifier,
    ) -> impl Future<Output = Result<Recorded, LedgerError>> + Send;

    /// Number of recorded claims.
    fn claim_count(&self) -> impl Future<Output = usize> + Send;
}

/// A ledger chosen at runtime.
#[derive(Debug)]
pub enum AnyLedger {
    /// Durable ledger.
    Sled(SledLedger),
    /// Trial-only ledger, emptied on restart.
    Memory(MemoryLedger),
}

impl AnyLedger {
    /// Whether claims survive a restart.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        matches!(self, Self::Sled(_))
    }
}

impl ClaimLedger for AnyLedger {
    async fn check_and_record(&self, nullifier: &Nullifier) -> Result<Recorded, LedgerError> {
        match self {
            Self::Sled(ledger) => ledger.check_and_record(nullifier).await,
            Self::Memory(ledger) => ledger.check_and_record(nullifier).await,
        }
    }

    async fn claim_count(&self) -> usize {
        match self {
            Self::Sled(ledger) => ledger.claim_count().await,
            Self::Memory(ledger) => ledger.claim_count().await,
        }
    }
}
