use std::future::Future;

use prdrop_core::{CanonicalInput, Proof, PublicInputs};

use crate::error::EngineError;

/// A proving system able to turn a canonical input vector into a proof and check it.
///
/// Loading keys may be expensive; callers go through [`crate::Prover`] and [`crate::Verifier`],
/// which load each key once.
pub trait ProofBackend: Send + Sync + 'static {
    /// Key material needed to prove.
    type ProvingKey: Send + Sync + 'static;
    /// Key material needed to verify.
    type VerifyingKey: Send + Sync + 'static;

    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Load the proving key and circuit.
    fn load_proving_key(
        &self,
    ) -> impl Future<Output = Result<Self::ProvingKey, EngineError>> + Send;

    /// Load the verifying key.
    fn load_verifying_key(
        &self,
    ) -> impl Future<Output = Result<Self::VerifyingKey, EngineError>> + Send;

    /// Prove `input`, returning the proof and its public inputs.
    fn prove(
        &self,
        key: &Self::ProvingKey,
        input: &CanonicalInput,
    ) -> impl Future<Output = Result<(Proof, PublicInputs), EngineError>> + Send;

    /// Check `proof` against `public_inputs`.
    ///
    /// A proof that does not verify is `Ok(false)`; errors are reserved for engine failures.
    fn verify(
        &self,
        key: &Self::VerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> impl Future<Output = Result<bool, EngineError>> + Send;
}
