use std::path::PathBuf;

use prdrop_core::{CanonicalInput, Proof, PublicInputs};

use crate::artifact::BackendKind;
use crate::backend::ProofBackend;
use crate::command::{CommandBackend, CommandProvingKey, CommandVerifyingKey};
use crate::digest::{DigestBackend, DigestKey};
use crate::error::EngineError;

/// Where a backend finds its artifacts and programs.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Which backend to run.
    pub kind: BackendKind,
    /// Compiled circuit artifact.
    pub circuit: PathBuf,
    /// Key envelope.
    pub key: PathBuf,
    /// Prover command template, for [`BackendKind::Command`].
    pub prove_cmd: Option<String>,
    /// Verifier command template, for [`BackendKind::Command`].
    pub verify_cmd: Option<String>,
}

/// A backend chosen at runtime.
#[derive(Debug, Clone)]
pub enum AnyBackend {
    /// See [`DigestBackend`].
    Digest(DigestBackend),
    /// See [`CommandBackend`].
    Command(CommandBackend),
}

impl From<BackendConfig> for AnyBackend {
    fn from(config: BackendConfig) -> Self {
        match config.kind {
            BackendKind::Digest => Self::Digest(DigestBackend::new(config.circuit, config.key)),
            BackendKind::Command => Self::Command(CommandBackend::new(
                config.circuit,
                config.key,
                config.prove_cmd,
                config.verify_cmd,
            )),
        }
    }
}

/// Proving key of an [`AnyBackend`].
pub enum AnyProvingKey {
    /// Key of [`AnyBackend::Digest`].
    Digest(DigestKey),
    /// Key of [`AnyBackend::Command`].
    Command(CommandProvingKey),
}

/// Verifying key of an [`AnyBackend`].
pub enum AnyVerifyingKey {
    /// Key of [`AnyBackend::Digest`].
    Digest(DigestKey),
    /// Key of [`AnyBackend::Command`].
    Command(CommandVerifyingKey),
}

fn foreign_key(backend: &AnyBackend) -> EngineError {
    EngineError::Backend(format!(
        "key was not loaded by the {} backend",
        backend.name()
    ))
}

impl ProofBackend for AnyBackend {
    type ProvingKey = AnyProvingKey;
    type VerifyingKey = AnyVerifyingKey;

    fn name(&self) -> &'static str {
        match self {
            Self::Digest(backend) => backend.name(),
            Self::Command(backend) => backend.name(),
        }
    }

    async fn load_proving_key(&self) -> Result<AnyProvingKey, EngineError> {
        match self {
            Self::Digest(backend) => backend.load_proving_key().await.map(AnyProvingKey::Digest),
            Self::Command(backend) => backend
                .load_proving_key()
                .await
                .map(AnyProvingKey::Command),
        }
    }

    async fn load_verifying_key(&self) -> Result<AnyVerifyingKey, EngineError> {
        match self {
            Self::Digest(backend) => backend
                .load_verifying_key()
                .await
                .map(AnyVerifyingKey::Digest),
            Self::Command(backend) => backend
                .load_verifying_key()
                .await
                .map(AnyVerifyingKey::Command),
        }
    }

    async fn prove(
        &self,
        key: &AnyProvingKey,
        input: &CanonicalInput,
    ) -> Result<(Proof, PublicInputs), EngineError> {
        match (self, key) {
            (Self::Digest(backend), AnyProvingKey::Digest(key)) => backend.prove(key, input).await,
            (Self::Command(backend), AnyProvingKey::Command(key)) => {
                backend.prove(key, input).await
            }
            (Self::Digest(_), AnyProvingKey::Command(_))
            | (Self::Command(_), AnyProvingKey::Digest(_)) => Err(foreign_key(self)),
        }
    }

    async fn verify(
        &self,
        key: &AnyVerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, EngineError> {
        match (self, key) {
            (Self::Digest(backend), AnyVerifyingKey::Digest(key)) => {
                backend.verify(key, proof, public_inputs).await
            }
            (Self::Command(backend), AnyVerifyingKey::Command(key)) => {
                backend.verify(key, proof, public_inputs).await
            }
            (Self::Digest(_), AnyVerifyingKey::Command(_))
            | (Self::Command(_), AnyVerifyingKey::Digest(_)) => Err(foreign_key(self)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_selects_backend() {
        let config = BackendConfig {
            kind: BackendKind::Command,
            circuit: PathBuf::from("circuit.json"),
            key: PathBuf::from("vk.json"),
            prove_cmd: Some("nargo prove".to_owned()),
            verify_cmd: None,
        };
        let backend = AnyBackend::from(config.clone());
        assert_eq!(backend.name(), "command");

        let backend = AnyBackend::from(BackendConfig {
            kind: BackendKind::Digest,
            ..config
        });
        assert_eq!(backend.name(), "digest");
    }
}
