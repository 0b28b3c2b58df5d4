//! Shared public formats and types for PRDROP.
//!
//! Turns an untrusted GitHub notification email into the fixed-layout input vector consumed by
//! the claim circuit, and defines the public-input layout that the claim service reads back.

pub mod canonical;
pub mod email;
pub mod field;
pub mod proof;
pub mod public_inputs;
pub mod wallet;

pub use canonical::{
    CanonicalInput, CanonicalizeError, CircuitParams, DkimWitness, PROTOCOL_VERSION,
    canonicalize,
};
pub use email::{EmailFields, Extraction, Miss, diagnose, extract};
pub use field::{FieldElement, FieldError};
pub use proof::Proof;
pub use public_inputs::{Nullifier, PUBLIC_INPUT_COUNT, PublicInputError, PublicInputs};
pub use wallet::{WalletAddress, WalletError};
