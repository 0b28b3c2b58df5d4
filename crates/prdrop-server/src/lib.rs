//! HTTP claim endpoint.
//!
//! `POST /claim-airdrop` runs the claim protocol; `GET /health/liveness` answers while the
//! process is up. Every claim response is `{ "success": bool, "message": string }`.

pub mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::{get, post};
use eyre::Context as _;
use prdrop_ledger::{AnyLedger, ClaimLedger as _, MemoryLedger, SledLedger};
use prdrop_proofs::{AnyBackend, BackendConfig, BackendKind, Verifier};
use prdrop_sdk::{AllowList, ClaimProtocol};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

pub use error::{AppError, ClaimResponse};
pub use state::{AppState, ServerProtocol};

/// Path of the claim endpoint.
pub const CLAIM_ROUTE: &str = "/claim-airdrop";

/// Where spent nullifiers are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerConfig {
    /// Durable `sled` database at this path.
    Sled(PathBuf),
    /// In-memory ledger, emptied on restart.
    Memory,
}

impl LedgerConfig {
    /// Open the ledger.
    ///
    /// # Errors
    /// Returns an error if the durable store cannot be opened.
    pub fn open(&self) -> eyre::Result<AnyLedger> {
        match self {
            Self::Sled(path) => {
                let ledger = SledLedger::open(path)
                    .with_context(|| format!("Failed to open ledger at {}", path.display()))?;
                Ok(AnyLedger::Sled(ledger))
            }
            Self::Memory => Ok(AnyLedger::Memory(MemoryLedger::default())),
        }
    }
}

/// Claim service configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub listen: SocketAddr,
    /// Nullifier ledger.
    pub ledger: LedgerConfig,
    /// Allow list file.
    pub allow_list: PathBuf,
    /// Verification backend.
    pub engine: BackendConfig,
    /// Accept the digest backend, which anyone holding its key can forge proofs for.
    pub allow_digest_backend: bool,
}

impl ServerConfig {
    /// Refuse the digest backend unless it was explicitly allowed for a trial.
    ///
    /// # Errors
    /// Returns an error if the engine is the digest backend and it was not allowed.
    pub fn check_backend(&self) -> eyre::Result<()> {
        match self.engine.kind {
            BackendKind::Digest if !self.allow_digest_backend => eyre::bail!(
                "The digest backend is not zero knowledge and must not guard a real airdrop; \
                 pass --allow-digest-backend to run a trial"
            ),
            BackendKind::Digest => {
                warn!("Serving with the digest backend: anyone holding its key can forge claims");
                Ok(())
            }
            BackendKind::Command => Ok(()),
        }
    }
}

/// Router serving the claim endpoint.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            CLAIM_ROUTE,
            post(routes::claim_airdrop).fallback(routes::method_not_allowed),
        )
        .route("/health/liveness", get(routes::liveness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the claim service until it fails.
///
/// The verifying key is loaded before the listener binds, so a misconfigured engine fails at
/// startup instead of on the first claim.
///
/// # Errors
/// Returns an error if the digest backend was not allowed, the ledger, the allow list or the
/// verifying key cannot be loaded, or the listener fails.
#[instrument(skip_all, fields(listen = %config.listen, backend = %config.engine.kind))]
pub async fn serve(config: ServerConfig) -> eyre::Result<()> {
    config.check_backend()?;
    let ledger = config.ledger.open()?;
    if !ledger.is_durable() {
        warn!("Using the in-memory ledger: claims are forgotten on restart");
    }
    let allow_list = AllowList::load(&config.allow_list)
        .await
        .with_context(|| format!("Failed to load {}", config.allow_list.display()))?;

    let verifier = Verifier::new(AnyBackend::from(config.engine));
    verifier
        .warm_up()
        .await
        .context("Failed to load verifying key")?;

    let state = AppState::new(ClaimProtocol::new(verifier, allow_list, ledger));
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    let claims = state.protocol().ledger().claim_count().await;
    info!(address = %config.listen, claims, "Claim service listening");

    axum::serve(listener, app(state))
        .await
        .context("Claim service stopped")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(kind: BackendKind, allow_digest_backend: bool) -> ServerConfig {
        ServerConfig {
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            ledger: LedgerConfig::Memory,
            allow_list: PathBuf::from("allow-list.json"),
            engine: BackendConfig {
                kind,
                circuit: PathBuf::from("circuit.json"),
                key: PathBuf::from("key.json"),
                prove_cmd: None,
                verify_cmd: Some("verify {proof}".to_owned()),
            },
            allow_digest_backend,
        }
    }

    #[test]
    fn digest_backend_needs_explicit_trial_opt_in() {
        assert!(config(BackendKind::Digest, false).check_backend().is_err());
        assert!(config(BackendKind::Digest, true).check_backend().is_ok());
        assert!(config(BackendKind::Command, false).check_backend().is_ok());
    }

    #[tokio::test]
    async fn serve_refuses_digest_backend_before_touching_files() {
        let error = serve(config(BackendKind::Digest, false))
            .await
            .expect_err("digest backend refused");
        assert!(error.to_string().contains("--allow-digest-backend"), "{error}");
    }

    #[test]
    fn memory_ledger_is_not_durable() -> eyre::Result<()> {
        assert!(!LedgerConfig::Memory.open()?.is_durable());
        let dir = tempfile::tempdir()?;
        assert!(LedgerConfig::Sled(dir.path().join("ledger")).open()?.is_durable());
        Ok(())
    }
}
