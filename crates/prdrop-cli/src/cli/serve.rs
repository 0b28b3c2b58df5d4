//! Claim service arguments.

use std::net::SocketAddr;
use std::path::PathBuf;

use prdrop_server::{LedgerConfig, ServerConfig};

use super::EngineArgs;

/// Arguments for `prdrop serve`.
#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Durable claim ledger directory.
    #[arg(
        long,
        env = "LEDGER_PATH",
        conflicts_with = "memory_ledger",
        required_unless_present = "memory_ledger"
    )]
    pub ledger: Option<PathBuf>,

    /// Keep claims in memory only. They are lost on restart.
    #[arg(long, env = "MEMORY_LEDGER", default_value_t = false)]
    pub memory_ledger: bool,

    /// Allow list of eligible repositories.
    #[arg(long, env = "ALLOW_LIST_FILE", default_value = "allow-list.json")]
    pub allow_list: PathBuf,

    /// Verification engine.
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Serve with the digest backend for a trial. Its proofs are forgeable by key holders.
    #[arg(long, env = "ALLOW_DIGEST_BACKEND", default_value_t = false)]
    pub allow_digest_backend: bool,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        let ledger = match args.ledger {
            Some(path) if !args.memory_ledger => LedgerConfig::Sled(path),
            Some(_) | None => LedgerConfig::Memory,
        };
        Self {
            listen: args.listen,
            ledger,
            allow_list: args.allow_list,
            engine: args.engine.into(),
            allow_digest_backend: args.allow_digest_backend,
        }
    }
}
