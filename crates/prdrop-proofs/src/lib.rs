//! Proving and verification engines for PRDROP claim proofs.
//!
//! The circuit itself is a black box behind [`ProofBackend`]. [`Prover`] and [`Verifier`] load
//! backend keys once and share them across concurrent callers.

mod any;
pub mod artifact;
mod backend;
pub mod command;
pub mod digest;
mod engine;
mod error;

pub use any::{AnyBackend, AnyProvingKey, AnyVerifyingKey, BackendConfig};
pub use artifact::{BackendKind, CircuitArtifact, KeyEnvelope};
pub use backend::ProofBackend;
pub use engine::{ProofOutput, Prover, Verifier};
pub use error::EngineError;
