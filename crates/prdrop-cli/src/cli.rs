//! Command-line interface for the `prdrop` application.

mod engine;
mod serve;

use std::path::PathBuf;

use clap::Parser;
pub use engine::EngineArgs;
use eyre::{Result, eyre};
use prdrop_core::CircuitParams;
use prdrop_core::canonical::{DEFAULT_MAX_BODY_LEN, DEFAULT_MAX_HEADER_LEN};
use prdrop_sdk::commands::SchemaTarget;
pub use serve::ServeArgs;

/// Command-line interface definition.
#[derive(Debug, Parser)]
#[command(name = "prdrop")]
#[command(about = "Airdrop claims for merged GitHub pull requests")]
pub struct Cli {
    /// CLI top-level command.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Notification email utilities.
    Email {
        /// Email subcommands.
        #[command(subcommand)]
        command: EmailCommands,
    },
    /// Prover input utilities.
    Inputs {
        /// Inputs subcommands.
        #[command(subcommand)]
        command: InputsCommands,
    },
    /// Key setup (operator focused).
    Setup {
        /// Setup subcommands.
        #[command(subcommand)]
        command: SetupCommands,
    },
    /// Prove canonical inputs into a claim request.
    Prove {
        /// Canonical inputs written by `inputs build`.
        #[arg(long, env = "INPUTS_FILE", default_value = "inputs.json")]
        inputs: PathBuf,
        /// Output file for the claim request. Printed to stdout if omitted.
        #[arg(long, env = "CLAIM_OUT")]
        out: Option<PathBuf>,
        /// Proof engine.
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Verify a claim request offline.
    Verify {
        /// Claim request written by `prove`.
        #[arg(long, env = "CLAIM_REQUEST_FILE", default_value = "claim-request.json")]
        request: PathBuf,
        /// Proof engine.
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Run the claim service.
    Serve {
        /// Service arguments.
        #[command(flatten)]
        args: ServeArgs,
    },
    /// Print a JSON schema.
    Schema {
        /// Document to describe (`claim-request` or `allow-list`).
        #[arg(
            long,
            env = "SCHEMA_TARGET",
            default_value = "claim-request",
            value_parser = parse_schema_target
        )]
        target: SchemaTarget,
    },
}

/// Email command group.
#[derive(Debug, clap::Subcommand)]
pub enum EmailCommands {
    /// Extract repository, PR number and CC address from a notification email.
    Extract {
        /// Raw notification email.
        #[arg(long, env = "EMAIL_FILE", default_value = "email.eml")]
        email: PathBuf,
        /// Output file for the extracted fields. Printed to stdout if omitted.
        #[arg(long, env = "FIELDS_OUT")]
        out: Option<PathBuf>,
    },
}

/// Inputs command group.
#[derive(Debug, clap::Subcommand)]
pub enum InputsCommands {
    /// Build canonical prover inputs.
    Build {
        /// Raw notification email.
        #[arg(long, env = "EMAIL_FILE", default_value = "email.eml")]
        email: PathBuf,
        /// DKIM witness of the email.
        #[arg(long, env = "DKIM_FILE", default_value = "dkim.json")]
        dkim: PathBuf,
        /// Wallet address receiving the airdrop, decimal or `0x` hex.
        #[arg(long, env = "WALLET_ADDRESS")]
        wallet: String,
        /// Header capacity of the claim circuit.
        #[arg(long, env = "MAX_HEADER_LEN", default_value_t = DEFAULT_MAX_HEADER_LEN)]
        max_header_len: usize,
        /// Body capacity of the claim circuit.
        #[arg(long, env = "MAX_BODY_LEN", default_value_t = DEFAULT_MAX_BODY_LEN)]
        max_body_len: usize,
        /// Output file for the inputs. Printed to stdout if omitted.
        #[arg(long, env = "INPUTS_OUT")]
        out: Option<PathBuf>,
    },
}

impl InputsCommands {
    /// Circuit parameters selected on the command line.
    #[must_use]
    pub const fn params(&self) -> CircuitParams {
        match self {
            Self::Build {
                max_header_len,
                max_body_len,
                ..
            } => CircuitParams {
                max_header_len: *max_header_len,
                max_body_len: *max_body_len,
            },
        }
    }
}

/// Setup command group.
#[derive(Debug, clap::Subcommand)]
pub enum SetupCommands {
    /// Derive a key for the digest backend.
    Digest {
        /// Compiled claim circuit.
        #[arg(long, env = "CIRCUIT_FILE", default_value = "circuit.json")]
        circuit: PathBuf,
        /// Output file for the key envelope.
        #[arg(long, env = "KEY_OUT", default_value = "key.json")]
        key_out: PathBuf,
    },
    /// Wrap a verifying key produced by an external prover.
    Command {
        /// Compiled claim circuit.
        #[arg(long, env = "CIRCUIT_FILE", default_value = "circuit.json")]
        circuit: PathBuf,
        /// Raw verifying key.
        #[arg(long, env = "VERIFYING_KEY_FILE", default_value = "vk")]
        vk: PathBuf,
        /// Output file for the key envelope.
        #[arg(long, env = "KEY_OUT", default_value = "key.json")]
        key_out: PathBuf,
    },
}

fn parse_schema_target(s: &str) -> Result<SchemaTarget> {
    match s {
        "claim-request" => Ok(SchemaTarget::ClaimRequest),
        "allow-list" => Ok(SchemaTarget::AllowList),
        other => Err(eyre!(
            "Invalid schema target: {other}. Expected 'claim-request' or 'allow-list'."
        )),
    }
}
