//! External prover and verifier programs.
//!
//! Commands are whitespace-separated templates. Each run gets a fresh temporary directory, and
//! these placeholders are replaced by file paths inside it:
//!
//! | placeholder       | file                                              |
//! |-------------------|---------------------------------------------------|
//! | `{circuit}`       | the circuit artifact                              |
//! | `{inputs}`        | canonical input map (JSON), written before proving |
//! | `{proof}`         | proof bytes                                       |
//! | `{public_inputs}` | public inputs (JSON array of decimal strings)     |
//! | `{vk}`            | verifying key bytes, written before verifying     |
//!
//! The prover must write `{proof}` and `{public_inputs}`. A proof verifies iff the verifier
//! exits with status 0 and is rejected iff it exits with status 1. Any other outcome, including
//! termination by a signal, is a process failure.

use std::path::{Path, PathBuf};
use std::process::Output;

use prdrop_core::{CanonicalInput, Proof, PublicInputs};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::artifact::{BackendKind, CircuitArtifact, KeyEnvelope, load_checked};
use crate::backend::ProofBackend;
use crate::error::EngineError;

const INPUTS_FILE: &str = "inputs.json";
const PROOF_FILE: &str = "proof";
const PUBLIC_INPUTS_FILE: &str = "public_inputs.json";
const VK_FILE: &str = "vk";

/// Verifier exit code meaning "proof rejected".
const REJECT_EXIT_CODE: i32 = 1;

/// Circuit needed by the external prover.
#[derive(Debug, Clone)]
pub struct CommandProvingKey {
    circuit: PathBuf,
}

/// Verifying key handed to the external verifier.
#[derive(Debug, Clone)]
pub struct CommandVerifyingKey {
    circuit: PathBuf,
    vk: Vec<u8>,
}

/// Wrap verifying key bytes produced by an external tool for `circuit`.
#[must_use]
pub fn verifying_key_envelope(circuit: &CircuitArtifact, vk: Vec<u8>) -> KeyEnvelope {
    KeyEnvelope::new(BackendKind::Command, circuit, vk)
}

/// Backend delegating to external programs.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    circuit: PathBuf,
    key: PathBuf,
    prove_cmd: Option<String>,
    verify_cmd: Option<String>,
}

impl CommandBackend {
    /// Backend for the circuit at `circuit` and the verifying key envelope at `key`.
    pub fn new(
        circuit: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
        prove_cmd: Option<String>,
        verify_cmd: Option<String>,
    ) -> Self {
        Self {
            circuit: circuit.into(),
            key: key.into(),
            prove_cmd,
            verify_cmd,
        }
    }
}

impl ProofBackend for CommandBackend {
    type ProvingKey = CommandProvingKey;
    type VerifyingKey = CommandVerifyingKey;

    fn name(&self) -> &'static str {
        BackendKind::Command.as_str()
    }

    async fn load_proving_key(&self) -> Result<CommandProvingKey, EngineError> {
        // Parsed only to fail early on a broken artifact.
        CircuitArtifact::load(&self.circuit).await?;
        Ok(CommandProvingKey {
            circuit: self.circuit.clone(),
        })
    }

    async fn load_verifying_key(&self) -> Result<CommandVerifyingKey, EngineError> {
        let (_, envelope) = load_checked(BackendKind::Command, &self.circuit, &self.key).await?;
        Ok(CommandVerifyingKey {
            circuit: self.circuit.clone(),
            vk: envelope.key,
        })
    }

    #[instrument(skip_all)]
    async fn prove(
        &self,
        key: &CommandProvingKey,
        input: &CanonicalInput,
    ) -> Result<(Proof, PublicInputs), EngineError> {
        let template = self
            .prove_cmd
            .as_deref()
            .ok_or_else(|| EngineError::Backend("no prover command configured".to_owned()))?;
        let workdir = Workdir::new(&key.circuit)?;

        workdir.write(INPUTS_FILE, serde_json::to_vec(input)?).await?;

        let output = workdir.run(template).await?;
        if !output.status.success() {
            return Err(EngineError::Process(format!(
                "prover exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let proof = workdir.read(PROOF_FILE).await?;
        let raw_inputs = workdir.read(PUBLIC_INPUTS_FILE).await?;
        let literals: Vec<String> = serde_json::from_slice(&raw_inputs)
            .map_err(EngineError::format(workdir.path(PUBLIC_INPUTS_FILE)))?;
        let public_inputs = PublicInputs::parse(&literals)
            .map_err(|error| EngineError::Backend(format!("prover output: {error}")))?;

        Ok((Proof::new(proof), public_inputs))
    }

    #[instrument(skip_all)]
    async fn verify(
        &self,
        key: &CommandVerifyingKey,
        proof: &Proof,
        public_inputs: &PublicInputs,
    ) -> Result<bool, EngineError> {
        let template = self
            .verify_cmd
            .as_deref()
            .ok_or_else(|| EngineError::Backend("no verifier command configured".to_owned()))?;
        let workdir = Workdir::new(&key.circuit)?;

        workdir.write(PROOF_FILE, proof.as_bytes().to_vec()).await?;
        workdir
            .write(
                PUBLIC_INPUTS_FILE,
                serde_json::to_vec(&public_inputs.to_strings())?,
            )
            .await?;
        workdir.write(VK_FILE, key.vk.clone()).await?;

        let output = workdir.run(template).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        match output.status.code() {
            Some(0) => Ok(true),
            Some(REJECT_EXIT_CODE) => {
                debug!(stderr = %stderr.trim(), "Verifier rejected proof");
                Ok(false)
            }
            Some(_) | None => Err(EngineError::Process(format!(
                "verifier failed ({}): {}",
                output.status,
                stderr.trim()
            ))),
        }
    }
}

/// Temporary directory of one external run. Removed on drop.
struct Workdir<'a> {
    dir: tempfile::TempDir,
    circuit: &'a Path,
}

impl<'a> Workdir<'a> {
    fn new(circuit: &'a Path) -> Result<Self, EngineError> {
        let dir = tempfile::tempdir().map_err(EngineError::artifact(std::env::temp_dir()))?;
        Ok(Self { dir, circuit })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    async fn write(&self, file: &str, contents: Vec<u8>) -> Result<(), EngineError> {
        let path = self.path(file);
        tokio::fs::write(&path, contents)
            .await
            .map_err(EngineError::artifact(path))
    }

    async fn read(&self, file: &str) -> Result<Vec<u8>, EngineError> {
        let path = self.path(file);
        tokio::fs::read(&path)
            .await
            .map_err(EngineError::artifact(path))
    }

    fn render(&self, token: &str) -> String {
        [
            ("{circuit}", self.circuit.to_path_buf()),
            ("{inputs}", self.path(INPUTS_FILE)),
            ("{proof}", self.path(PROOF_FILE)),
            ("{public_inputs}", self.path(PUBLIC_INPUTS_FILE)),
            ("{vk}", self.path(VK_FILE)),
        ]
        .iter()
        .fold(token.to_owned(), |rendered, (placeholder, path)| {
            rendered.replace(placeholder, &path.display().to_string())
        })
    }

    async fn run(&self, template: &str) -> Result<Output, EngineError> {
        let mut tokens = template.split_whitespace().map(|token| self.render(token));
        let program = tokens
            .next()
            .ok_or_else(|| EngineError::Process("empty command template".to_owned()))?;

        debug!(%program, "Running external program");
        Command::new(&program)
            .args(tokens)
            .current_dir(self.dir.path())
            .output()
            .await
            .map_err(|error| EngineError::Process(format!("failed to run {program}: {error}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use prdrop_core::public_inputs::Nullifier;
    use prdrop_core::{CircuitParams, DkimWitness, FieldElement, canonicalize, extract};
    use tempfile::TempDir;
    use test_utils::{WALLET, dkim_witness_json, merged_notification};

    use super::*;
    use crate::engine::{Prover, Verifier};

    struct Fixture {
        dir: TempDir,
        circuit: PathBuf,
        key: PathBuf,
    }

    impl Fixture {
        async fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let circuit_path = dir.path().join("circuit.json");
            let key_path = dir.path().join("vk.json");
            let circuit = CircuitArtifact {
                bytecode: "H4sIAAAAAAAA/claim".to_owned(),
                noir_version: None,
                abi: serde_json::Value::Null,
            };
            tokio::fs::write(&circuit_path, serde_json::to_vec(&circuit).expect("json"))
                .await
                .expect("write circuit");
            verifying_key_envelope(&circuit, b"verifying-key".to_vec())
                .save(&key_path)
                .await
                .expect("write key");
            Self {
                dir,
                circuit: circuit_path,
                key: key_path,
            }
        }

        async fn script(&self, name: &str, body: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            tokio::fs::write(&path, body).await.expect("write script");
            path
        }

        fn backend(&self, prove_cmd: Option<String>, verify_cmd: Option<String>) -> CommandBackend {
            CommandBackend::new(&self.circuit, &self.key, prove_cmd, verify_cmd)
        }
    }

    fn input() -> CanonicalInput {
        let witness: DkimWitness =
            serde_json::from_str(&dkim_witness_json(3)).expect("fixture witness is valid");
        canonicalize(
            &extract(&merged_notification()),
            &witness,
            WALLET,
            &CircuitParams::default(),
        )
        .expect("fixture canonicalizes")
    }

    fn expected_public_inputs() -> PublicInputs {
        PublicInputs::assemble(
            &Nullifier::new(FieldElement::from_u64(5)),
            b"acme/widgets",
            &FieldElement::from_u64(6),
        )
        .expect("repository name fits")
    }

    #[tokio::test]
    async fn runs_external_prover_and_verifier() -> Result<(), Box<dyn std::error::Error>> {
        let fixture = Fixture::new().await;
        let prepared = fixture.dir.path().join("prepared.json");
        tokio::fs::write(
            &prepared,
            serde_json::to_vec(&expected_public_inputs().to_strings())?,
        )
        .await?;
        let prover_script = fixture
            .script(
                "prove.sh",
                &format!(
                    "test -s \"$1\" && printf 'proof-bytes' > \"$2\" && cp {} \"$3\"\n",
                    prepared.display()
                ),
            )
            .await;
        let verifier_script = fixture
            .script(
                "verify.sh",
                "printf 'proof-bytes' | cmp -s - \"$1\" && test -s \"$2\" && \
                 printf 'verifying-key' | cmp -s - \"$3\"\n",
            )
            .await;

        let backend = fixture.backend(
            Some(format!(
                "sh {} {{inputs}} {{proof}} {{public_inputs}}",
                prover_script.display()
            )),
            Some(format!(
                "sh {} {{proof}} {{public_inputs}} {{vk}}",
                verifier_script.display()
            )),
        );
        let prover = Prover::new(backend.clone());
        let verifier = Verifier::new(backend);

        let output = prover.generate_proof(&input()).await?;
        assert_eq!(output.proof.as_bytes(), b"proof-bytes");
        assert_eq!(output.public_inputs, expected_public_inputs());
        assert!(verifier.verify_proof(&output.proof, &output.public_inputs).await?);

        let tampered = Proof::new(b"proof-bytez".to_vec());
        assert!(!verifier.verify_proof(&tampered, &output.public_inputs).await?);
        Ok(())
    }

    #[tokio::test]
    async fn failing_prover_is_a_process_error() {
        let fixture = Fixture::new().await;
        let prover = Prover::new(fixture.backend(Some("false".to_owned()), None));
        assert!(matches!(
            prover.generate_proof(&input()).await,
            Err(EngineError::Process(_))
        ));
    }

    #[tokio::test]
    async fn missing_command_is_a_backend_error() {
        let fixture = Fixture::new().await;
        let verifier = Verifier::new(fixture.backend(None, None));
        assert!(matches!(
            verifier
                .verify_proof(&Proof::new(vec![1]), &expected_public_inputs())
                .await,
            Err(EngineError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn verifier_exit_status_decides() -> Result<(), EngineError> {
        let fixture = Fixture::new().await;
        let accept = Verifier::new(fixture.backend(None, Some("true".to_owned())));
        let reject = Verifier::new(fixture.backend(None, Some("false".to_owned())));
        let proof = Proof::new(vec![1, 2, 3]);
        assert!(accept.verify_proof(&proof, &expected_public_inputs()).await?);
        assert!(!reject.verify_proof(&proof, &expected_public_inputs()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn broken_verifier_is_a_process_error() {
        let fixture = Fixture::new().await;
        let crashed = fixture.script("crashed.sh", "exit 2\n").await;
        let killed = fixture.script("killed.sh", "kill -KILL $$\n").await;
        let proof = Proof::new(vec![1, 2, 3]);

        for template in [
            "sh /nonexistent/verify.sh {proof}".to_owned(),
            format!("sh {}", crashed.display()),
            format!("sh {}", killed.display()),
        ] {
            let verifier = Verifier::new(fixture.backend(None, Some(template.clone())));
            let result = verifier
                .verify_proof(&proof, &expected_public_inputs())
                .await;
            assert!(
                matches!(result, Err(EngineError::Process(_))),
                "{template}: {result:?}"
            );
        }
    }
}
