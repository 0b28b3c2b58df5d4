//! Workflow commands behind the `prdrop` binary.

mod claim;
mod inputs;
mod setup;

use std::path::Path;

pub use claim::{prove, verify_request};
use eyre::Context as _;
pub use inputs::{build_inputs, extract_email};
use serde::Serialize;
pub use setup::{setup_command, setup_digest};
use tracing::info;

use crate::eligibility::AllowListConfig;
use crate::protocol::ClaimRequest;

/// Documents with a published JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaTarget {
    /// Body of `POST /claim-airdrop`.
    ClaimRequest,
    /// Allow list file read by the claim service.
    AllowList,
}

/// Print the JSON schema of `target`.
///
/// # Errors
/// Returns an error if the schema cannot be serialized.
#[allow(clippy::print_stdout, reason = "Prints schema to stdout")]
pub fn print_schema(target: SchemaTarget) -> eyre::Result<()> {
    let schema = match target {
        SchemaTarget::ClaimRequest => schemars::schema_for!(ClaimRequest),
        SchemaTarget::AllowList => schemars::schema_for!(AllowListConfig),
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> eyre::Result<T> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {what} file: {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("Failed to parse {what}"))
}

#[allow(clippy::print_stdout, reason = "Writes to stdout when no output file is given")]
async fn write_json<T: Serialize>(value: &T, out: Option<&Path>, what: &str) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {what} file: {}", path.display()))?;
            info!(file = ?path, "{what} written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
