//! Circuit and key artifacts loaded by the engines.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use prdrop_core::PROTOCOL_VERSION;
use serde::{Deserialize, Serialize};
use serde_with::hex::Hex;
use serde_with::serde_as;
use sha2::{Digest as _, Sha256};
use tracing::debug;

use crate::error::EngineError;

/// Proving backend a key was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Transparent SHA-256 commitment proofs.
    Digest,
    /// External prover and verifier programs.
    Command,
}

impl BackendKind {
    /// Lowercase name, as used in key envelopes and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Digest => "digest",
            Self::Command => "command",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "digest" => Ok(Self::Digest),
            "command" => Ok(Self::Command),
            other => Err(format!(
                "unknown backend {other:?}, expected `digest` or `command`"
            )),
        }
    }
}

/// Compiled claim circuit.
///
/// Only `bytecode` is interpreted: its SHA-256 identifies the circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitArtifact {
    /// Compiled circuit, as emitted by the circuit compiler.
    pub bytecode: String,
    /// Compiler version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noir_version: Option<String>,
    /// Circuit ABI.
    #[serde(default)]
    pub abi: serde_json::Value,
}

impl CircuitArtifact {
    /// Read a circuit artifact from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(EngineError::artifact(path))?;
        let circuit: Self = serde_json::from_slice(&raw).map_err(EngineError::format(path))?;
        debug!(path = %path.display(), circuit_hash = %circuit.circuit_hash(), "Loaded circuit");
        Ok(circuit)
    }

    /// Hex SHA-256 of the bytecode.
    #[must_use]
    pub fn circuit_hash(&self) -> String {
        hex::encode(Sha256::digest(self.bytecode.as_bytes()))
    }
}

/// Backend key bound to a protocol version and a circuit.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEnvelope {
    /// Protocol version the key was made for.
    pub protocol_version: u16,
    /// Backend the key belongs to.
    pub backend: BackendKind,
    /// [`CircuitArtifact::circuit_hash`] of the circuit the key was made for.
    pub circuit_hash: String,
    /// Backend key material.
    #[serde_as(as = "Hex")]
    pub key: Vec<u8>,
}

impl fmt::Debug for KeyEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEnvelope")
            .field("protocol_version", &self.protocol_version)
            .field("backend", &self.backend)
            .field("circuit_hash", &self.circuit_hash)
            .finish_non_exhaustive()
    }
}

impl KeyEnvelope {
    /// Wrap key material for `circuit` under the running protocol version.
    #[must_use]
    pub fn new(backend: BackendKind, circuit: &CircuitArtifact, key: Vec<u8>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            backend,
            circuit_hash: circuit.circuit_hash(),
            key,
        }
    }

    /// Read a key envelope from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(EngineError::artifact(path))?;
        serde_json::from_slice(&raw).map_err(EngineError::format(path))
    }

    /// Write the envelope as pretty JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), EngineError> {
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json)
            .await
            .map_err(EngineError::artifact(path))
    }

    /// Check that the key belongs to `backend`, the running protocol and `circuit`.
    ///
    /// # Errors
    /// Returns [`EngineError::VersionMismatch`] on any difference.
    pub fn check(&self, backend: BackendKind, circuit: &CircuitArtifact) -> Result<(), EngineError> {
        if self.protocol_version != PROTOCOL_VERSION {
            return Err(EngineError::VersionMismatch {
                expected: format!("protocol version {PROTOCOL_VERSION}"),
                found: format!("protocol version {}", self.protocol_version),
            });
        }
        if self.backend != backend {
            return Err(EngineError::VersionMismatch {
                expected: format!("{backend} backend"),
                found: format!("{} backend", self.backend),
            });
        }
        let circuit_hash = circuit.circuit_hash();
        if self.circuit_hash != circuit_hash {
            return Err(EngineError::VersionMismatch {
                expected: format!("circuit {circuit_hash}"),
                found: format!("circuit {}", self.circuit_hash),
            });
        }
        Ok(())
    }
}

/// Load a circuit and the key envelope made for it.
///
/// # Errors
/// Returns an error if either file cannot be loaded or the key does not match.
pub async fn load_checked(
    backend: BackendKind,
    circuit_path: &Path,
    key_path: &Path,
) -> Result<(CircuitArtifact, KeyEnvelope), EngineError> {
    let (circuit, envelope) = tokio::try_join!(
        CircuitArtifact::load(circuit_path),
        KeyEnvelope::load(key_path)
    )?;
    envelope.check(backend, &circuit)?;
    Ok((circuit, envelope))
}
