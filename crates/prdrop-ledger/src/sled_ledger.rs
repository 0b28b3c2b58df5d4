use std::path::Path;

use prdrop_core::public_inputs::Nullifier;
use tracing::{debug, info, warn};

use crate::{ClaimLedger, ClaimRecord, LedgerError, Recorded};

const CLAIMS_TREE: &str = "claims";

/// Durable ledger backed by a `sled` database.
///
/// Keys are the fixed-width big-endian nullifier encoding, so every rendering of one value maps
/// to one key.
#[derive(Debug, Clone)]
pub struct SledLedger {
    claims: sled::Tree,
}

impl SledLedger {
    /// Open or create the ledger at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let db = sled::open(path)?;
        let claims = db.open_tree(CLAIMS_TREE)?;
        info!(path = %path.display(), claims = claims.len(), "Opened claim ledger");
        Ok(Self { claims })
    }

    /// Insert the claim, then make it durable with `flush`.
    ///
    /// A claim that cannot be flushed is removed again, so the nullifier stays claimable.
    async fn record_then<F, Fut>(
        &self,
        nullifier: &Nullifier,
        flush: F,
    ) -> Result<Recorded, LedgerError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = sled::Result<usize>> + Send,
    {
        let record = ClaimRecord::now(nullifier);
        let value = serde_json::to_vec(&record)?;
        let key = nullifier.to_bytes();

        let swapped = self
            .claims
            .compare_and_swap(key, None::<&[u8]>, Some(value.as_slice()))?;
        if swapped.is_err() {
            return Ok(Recorded::AlreadyClaimed);
        }

        if let Err(error) = flush().await {
            warn!(%nullifier, %error, "Failed to persist claim; releasing nullifier");
            let released =
                self.claims
                    .compare_and_swap(key, Some(value.as_slice()), None::<&[u8]>)?;
            if released.is_err() {
                warn!(%nullifier, "Claim changed before it could be released");
            }
            return Err(error.into());
        }

        debug!(%nullifier, "Claim recorded");
        Ok(Recorded::Accepted(record))
    }
}

impl ClaimLedger for SledLedger {
    async fn check_and_record(&self, nullifier: &Nullifier) -> Result<Recorded, LedgerError> {
        self.record_then(nullifier, || self.claims.flush_async())
            .await
    }

    async fn claim_count(&self) -> usize {
        self.claims.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tests::{nullifier, race};

    #[tokio::test]
    async fn claims_survive_reopen() -> Result<(), LedgerError> {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let ledger = SledLedger::open(dir.path())?;
            assert!(matches!(
                ledger.check_and_record(&nullifier(9)).await?,
                Recorded::Accepted(_)
            ));
        }

        let reopened = SledLedger::open(dir.path())?;
        assert_eq!(
            reopened.check_and_record(&nullifier(9)).await?,
            Recorded::AlreadyClaimed
        );
        assert_eq!(reopened.claim_count().await, 1);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_claims_accept_exactly_one() -> Result<(), LedgerError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = Arc::new(SledLedger::open(dir.path())?);
        assert_eq!(race(Arc::clone(&ledger), 64).await, 1);
        assert_eq!(ledger.claim_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_flush_releases_the_nullifier() -> Result<(), LedgerError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = SledLedger::open(dir.path())?;

        let result = ledger
            .record_then(&nullifier(4), || async {
                Err(sled::Error::Unsupported("disk full".to_owned()))
            })
            .await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert!(ledger.claims.get(nullifier(4).to_bytes())?.is_none());
        assert_eq!(ledger.claim_count().await, 0);

        assert!(matches!(
            ledger.check_and_record(&nullifier(4)).await?,
            Recorded::Accepted(_)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn stored_record_is_readable_json() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let ledger = SledLedger::open(dir.path())?;
        let Recorded::Accepted(record) = ledger.check_and_record(&nullifier(3)).await? else {
            panic!("fresh nullifier must be accepted");
        };

        let raw = ledger
            .claims
            .get(nullifier(3).to_bytes())?
            .expect("record stored");
        let stored: ClaimRecord = serde_json::from_slice(&raw)?;
        assert_eq!(stored, record);
        assert_eq!(serde_json::to_value(&stored)?["nullifier"], "3");
        Ok(())
    }
}
