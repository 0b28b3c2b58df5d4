//! Prover and verifier front ends with memoized, single-flight key loading.

use std::time::Instant;

use prdrop_core::{CanonicalInput, Proof, PublicInputs};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::backend::ProofBackend;
use crate::error::EngineError;

/// A generated proof with its public inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofOutput {
    /// Proof bytes.
    pub proof: Proof,
    /// Public inputs the proof commits to.
    pub public_inputs: PublicInputs,
    /// Wall-clock proving time.
    pub proving_time_ms: u64,
}

/// Generates claim proofs.
///
/// The proving key is loaded on first use. Concurrent first callers share one load; a failed
/// load is retried by the next caller.
pub struct Prover<B: ProofBackend> {
    backend: B,
    key: OnceCell<B::ProvingKey>,
}

impl<B: ProofBackend> Prover<B> {
    /// Wrap a backend. Nothing is loaded yet.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            key: OnceCell::new(),
        }
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the proving key now instead of on the first proof.
    ///
    /// # Errors
    /// Returns an error if the key cannot be loaded.
    pub async fn warm_up(&self) -> Result<(), EngineError> {
        self.proving_key().await.map(|_| ())
    }

    /// Prove a canonical input vector.
    ///
    /// # Errors
    /// Returns an error if the key cannot be loaded or the backend fails.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn generate_proof(&self, input: &CanonicalInput) -> Result<ProofOutput, EngineError> {
        let key = self.proving_key().await?;

        let started = Instant::now();
        let (proof, public_inputs) = self.backend.prove(key, input).await?;
        let proving_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            proving_time_ms,
            proof_bytes = proof.len(),
            public_inputs = public_inputs.len(),
            "Proof generated"
        );

        Ok(ProofOutput {
            proof,
            public_inputs,
            proving_time_ms,
        })
    }

    async fn proving_key(&self) -> Result<&B::ProvingKey, EngineError> {
        self.key
            .get_or_try_init(|| async {
                info!(backend = self.backend.name(), "Loading proving key");
                self.backend.load_proving_key().await
            })
            .await
    }
}

/// Verifies claim proofs against one verifying key.
///
/// Key loading follows the same single-flight rule as [`Prover`].
pub struct Verifier<B: ProofBackend> {
    backend: B,
    key: OnceCell<B::VerifyingKey>,
}

impl<B: ProofBackend> Verifier<B> {
    /// Wrap a backend. Nothing is loaded yet.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            key: OnceCell::new(),
        }
    }

    /// The wrapped backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the verifying key now instead of on the first verification.
    ///
    /// # Errors
    /// Returns an error if the key cannot be loaded.
    pub async fn warm_up(&self) -> Result<(), EngineError> {
        self.verifying_key().await.map(|_| ())
    }

    /// Check a proof. A public-input vector of the wrong shape never verifies.
    ///
    /// # Errors
    /// Returns an error if the key cannot be loaded or the backend fails. A proof that does
    /// not verify is `Ok(false)`.
    #[instrument(skip_all, fields(backend = self.backend.name()))]
    pub async fn verify_proof(
        &self,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, EngineError> {
        if let Err(error) = public_inputs.check_length() {
            debug!(%error, "Public inputs do not match the circuit layout");
            return Ok(false);
        }

        let key = self.verifying_key().await?;
        let started = Instant::now();
        let valid = self.backend.verify(key, proof, public_inputs).await?;
        debug!(
            valid,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Proof checked"
        );
        Ok(valid)
    }

    async fn verifying_key(&self) -> Result<&B::VerifyingKey, EngineError> {
        self.key
            .get_or_try_init(|| async {
                info!(backend = self.backend.name(), "Loading verifying key");
                self.backend.load_verifying_key().await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use prdrop_core::public_inputs::Nullifier;
    use prdrop_core::{CircuitParams, DkimWitness, FieldElement, canonicalize, extract};
    use test_utils::{WALLET, dkim_witness_json, merged_notification};

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        loads: AtomicUsize,
        fail_next_load: AtomicBool,
    }

    impl CountingBackend {
        async fn load(&self) -> Result<u8, EngineError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_next_load.swap(false, Ordering::SeqCst) {
                return Err(EngineError::Backend("artifact store unavailable".to_owned()));
            }
            Ok(7)
        }
    }

    impl ProofBackend for CountingBackend {
        type ProvingKey = u8;
        type VerifyingKey = u8;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn load_proving_key(&self) -> Result<u8, EngineError> {
            self.load().await
        }

        async fn load_verifying_key(&self) -> Result<u8, EngineError> {
            self.load().await
        }

        async fn prove(
            &self,
            key: &u8,
            _input: &CanonicalInput,
        ) -> Result<(Proof, PublicInputs), EngineError> {
            let public_inputs = PublicInputs::assemble(
                &Nullifier::new(FieldElement::from_u64(1)),
                b"acme/widgets",
                &FieldElement::from_u64(2),
            )?;
            Ok((Proof::new(vec![*key]), public_inputs))
        }

        async fn verify(
            &self,
            key: &u8,
            proof: &Proof,
            _public_inputs: &PublicInputs,
        ) -> Result<bool, EngineError> {
            Ok(proof.as_bytes() == [*key])
        }
    }

    fn input() -> CanonicalInput {
        let witness: DkimWitness =
            serde_json::from_str(&dkim_witness_json(1)).expect("fixture witness is valid");
        canonicalize(
            &extract(&merged_notification()),
            &witness,
            WALLET,
            &CircuitParams::default(),
        )
        .expect("fixture canonicalizes")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_callers_share_one_load() {
        let prover = Arc::new(Prover::new(CountingBackend::default()));
        let input = Arc::new(input());

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let prover = Arc::clone(&prover);
                let input = Arc::clone(&input);
                tokio::spawn(async move { prover.generate_proof(&input).await })
            })
            .collect();
        for task in tasks {
            let output = task.await.expect("task joins").expect("proof generated");
            assert_eq!(output.proof.as_bytes(), [7]);
        }

        assert_eq!(prover.backend().loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let backend = CountingBackend::default();
        backend.fail_next_load.store(true, Ordering::SeqCst);
        let verifier = Verifier::new(backend);
        let proof = Proof::new(vec![7]);
        let public_inputs = PublicInputs::assemble(
            &Nullifier::new(FieldElement::from_u64(1)),
            b"a/b",
            &FieldElement::from_u64(2),
        )
        .expect("repository name fits");

        assert!(matches!(
            verifier.verify_proof(&proof, &public_inputs).await,
            Err(EngineError::Backend(_))
        ));
        assert!(matches!(
            verifier.verify_proof(&proof, &public_inputs).await,
            Ok(true)
        ));
        assert_eq!(verifier.backend().loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn wrong_shape_never_verifies_or_loads() {
        let verifier = Verifier::new(CountingBackend::default());
        let short = PublicInputs::new(vec![FieldElement::from_u64(1)]);
        assert!(matches!(
            verifier.verify_proof(&Proof::new(vec![7]), &short).await,
            Ok(false)
        ));
        assert_eq!(verifier.backend().loads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn output_uses_claim_request_field_names() -> Result<(), Box<dyn std::error::Error>> {
        let prover = Prover::new(CountingBackend::default());
        let output = prover.generate_proof(&input()).await?;
        let json = serde_json::to_value(&output)?;
        assert_eq!(json["proof"], serde_json::json!([7]));
        assert!(json["publicInputs"].is_array());
        assert!(json["provingTimeMs"].is_u64());
        Ok(())
    }
}
