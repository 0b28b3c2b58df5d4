//! PRDROP claim protocol and the workflows built on it.
//!
//! [`protocol`] runs a claim through verification, eligibility and the nullifier ledger.
//! [`commands`] holds the client and operator workflows behind the `prdrop` binary.

pub mod commands;
pub mod eligibility;
pub mod protocol;

pub use eligibility::{AllowList, AllowListConfig, EligibilityError, EligibilityGate};
pub use protocol::{
    ClaimError, ClaimProtocol, ClaimReceipt, ClaimRequest, ClaimState, ErrorKind, VerifiedClaim,
    verify_claim,
};
