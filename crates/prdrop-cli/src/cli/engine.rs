//! Proof engine arguments shared by `prove`, `verify` and `serve`.

use std::path::PathBuf;

use eyre::{Result, eyre};
use prdrop_proofs::{BackendConfig, BackendKind};

/// Which backend runs and where it finds its artifacts.
#[derive(Debug, Clone, clap::Args)]
pub struct EngineArgs {
    /// Proof backend (`digest` or `command`).
    #[arg(long, env = "BACKEND", default_value = "digest", value_parser = parse_backend)]
    pub backend: BackendKind,
    /// Compiled claim circuit.
    #[arg(long, env = "CIRCUIT_FILE", default_value = "circuit.json")]
    pub circuit: PathBuf,
    /// Key envelope written by `setup`.
    #[arg(long, env = "KEY_FILE", default_value = "key.json")]
    pub key: PathBuf,
    /// Prover command template for the `command` backend.
    ///
    /// Placeholders: `{circuit}`, `{inputs}`, `{proof}`, `{public_inputs}`.
    #[arg(long, env = "PROVE_CMD")]
    pub prove_cmd: Option<String>,
    /// Verifier command template for the `command` backend.
    ///
    /// Placeholders: `{vk}`, `{proof}`, `{public_inputs}`.
    #[arg(long, env = "VERIFY_CMD")]
    pub verify_cmd: Option<String>,
}

impl From<EngineArgs> for BackendConfig {
    fn from(args: EngineArgs) -> Self {
        Self {
            kind: args.backend,
            circuit: args.circuit,
            key: args.key,
            prove_cmd: args.prove_cmd,
            verify_cmd: args.verify_cmd,
        }
    }
}

pub(super) fn parse_backend(s: &str) -> Result<BackendKind> {
    s.parse().map_err(|e: String| eyre!("Invalid backend: {e}"))
}
