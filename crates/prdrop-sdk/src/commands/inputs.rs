use std::path::{Path, PathBuf};

use eyre::Context as _;
use prdrop_core::{CircuitParams, DkimWitness, Extraction, canonicalize};
use tracing::{info, instrument, warn};

use super::{read_json, write_json};

/// Extract the identity fields of a notification email.
///
/// Writes the fields and every boundary that was not found to `out`, or to stdout.
///
/// # Errors
/// Returns an error if the email cannot be read or the result cannot be written.
#[instrument(skip_all, fields(email = %email.display()))]
pub async fn extract_email(email: PathBuf, out: Option<PathBuf>) -> eyre::Result<()> {
    let raw_email = read_email(&email).await?;
    let extraction = Extraction::run(&raw_email);
    report_misses(&extraction);

    write_json(&extraction, out.as_deref(), "Email fields").await
}

/// Build the canonical prover input for a notification email.
///
/// # Errors
/// Returns an error if a file cannot be read, a field overflows its buffer, the wallet address
/// is invalid or the DKIM witness is inconsistent.
#[instrument(skip_all, fields(email = %email.display(), wallet = %wallet))]
pub async fn build_inputs(
    email: PathBuf,
    dkim: PathBuf,
    wallet: String,
    params: CircuitParams,
    out: Option<PathBuf>,
) -> eyre::Result<()> {
    let raw_email = read_email(&email).await?;
    let extraction = Extraction::run(&raw_email);
    report_misses(&extraction);

    let witness: DkimWitness = read_json(&dkim, "DKIM witness").await?;
    let input = canonicalize(&extraction.fields, &witness, &wallet, &params)
        .context("Failed to canonicalize proof inputs")?;

    info!(
        repo_name = %extraction.fields.repo_name,
        pr_number = %extraction.fields.pr_number,
        max_header_len = params.max_header_len,
        max_body_len = params.max_body_len,
        "Proof inputs built"
    );
    write_json(&input, out.as_deref(), "Proof inputs").await
}

async fn read_email(path: &Path) -> eyre::Result<String> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read email file: {}", path.display()))?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn report_misses(extraction: &Extraction) {
    for miss in &extraction.misses {
        warn!(?miss, field = miss.field(), "Email boundary not found, field left empty");
    }
}
