#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use roundproof_core::capability::{CapabilityProbe, Environment};
use roundproof_core::digest::{sha256, truncate_u64};
use roundproof_core::orchestrator::{Circuit, ProofOrchestrator};
use roundproof_core::proof::{ProofKind, ProofPath};
use roundproof_core::stats::TrainingStats;
use roundproof_core::toolchain::ProcessToolchain;
use tempfile::TempDir;

/// Stand-in for the circuit toolchain: each proof embeds the inputs it was given.
const FAKE_TOOLCHAIN: &str = r#"
case "$1" in
  --version) echo "nargo version = 0.0.0-test" ;;
  compile) test -f src/main.nr ;;
  execute)
    mkdir -p proofs
    { echo "proof-of"; cat Prover.toml; } > proofs/proof
    echo "vk" > proofs/vk
    ;;
  verify) test -s proofs/proof ;;
  *) exit 64 ;;
esac
"#;

const BROKEN_COMPILER: &str = r#"
case "$1" in
  --version) echo "nargo version = 0.0.0-test" ;;
  compile) echo "error: type mismatch in main.nr" >&2; exit 1 ;;
  *) exit 0 ;;
esac
"#;

struct Workspace {
    dir: TempDir,
    model_update: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        for circuit in Circuit::ALL {
            let src = dir.path().join("circuits").join(circuit.dir_name()).join("src");
            std::fs::create_dir_all(&src).expect("circuit dir");
            std::fs::write(src.join("main.nr"), "fn main() {}").expect("main.nr");
        }
        let model_update = dir.path().join("model_diff.pt");
        std::fs::write(&model_update, b"trained weights").expect("model update");
        Self { dir, model_update }
    }

    fn script(&self, name: &str, body: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).expect("script");
        path.display().to_string()
    }

    fn orchestrator(&self, script: &str) -> ProofOrchestrator {
        let toolchain =
            ProcessToolchain::new("sh", Duration::from_secs(10)).with_leading_args([script]);
        ProofOrchestrator::new(
            Arc::new(toolchain),
            self.dir.path().join("circuits"),
            self.dir.path().join("proofs"),
        )
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

#[tokio::test]
async fn real_round_produces_three_verified_chained_proofs() {
    let ws = Workspace::new();
    let script = ws.script("nargo.sh", FAKE_TOOLCHAIN);
    let caps = CapabilityProbe::new("sh")
        .with_args([script.as_str(), "--version"])
        .with_environment(Environment::Linux)
        .detect()
        .await;
    assert!(caps.proofs_enabled);

    let set = ws
        .orchestrator(&script)
        .generate_all(&TrainingStats::default(), &caps, &ws.model_update)
        .await
        .expect("proofs");
    assert_eq!(set.path, ProofPath::Real);
    assert_eq!(set.artifacts.len(), 3);
    assert!(set.all_verified());

    let training = set.get(ProofKind::Training).expect("training");
    let diff = set.get(ProofKind::ModelDiff).expect("model diff");
    assert_eq!(diff.depends_on, Some(training.proof_hash));
    assert!(training.created_at_ms <= diff.created_at_ms);

    let diff_proof = std::fs::read(diff.proof_path.as_ref().expect("proof path")).expect("proof");
    assert_eq!(diff.proof_hash, sha256(&diff_proof));
    let text = String::from_utf8_lossy(&diff_proof);
    assert!(text.contains(&truncate_u64(&training.proof_hash).to_string()));
    assert!(ws.root().join("proofs/training_proof_inputs.json").is_file());
}

#[tokio::test]
async fn compile_failure_with_toolchain_present_falls_back() {
    let ws = Workspace::new();
    let script = ws.script("nargo.sh", BROKEN_COMPILER);
    let caps = CapabilityProbe::new("sh")
        .with_args([script.as_str(), "--version"])
        .with_environment(Environment::WindowsSubsystem)
        .detect()
        .await;
    assert!(caps.proofs_enabled);

    let set = ws
        .orchestrator(&script)
        .generate_all(&TrainingStats::default(), &caps, &ws.model_update)
        .await
        .expect("fallback proofs");
    assert!(set.is_simulated());
    assert!(set.fallback_reason().unwrap_or_default().contains("type mismatch"));
    assert_eq!(set.artifacts.len(), 1);
    assert_eq!(set.artifacts[0].proof_hash, sha256(b"trained weights"));
}

#[tokio::test]
async fn absent_toolchain_yields_single_simulated_artifact() {
    let ws = Workspace::new();
    let caps = CapabilityProbe::new("roundproof-missing-toolchain")
        .with_environment(Environment::Linux)
        .detect()
        .await;
    assert!(!caps.proofs_enabled);

    let set = ws
        .orchestrator("unused.sh")
        .generate_all(&TrainingStats::default(), &caps, &ws.model_update)
        .await
        .expect("simulated proofs");
    assert_eq!(set.artifacts.len(), 1);
    assert_eq!(set.artifacts[0].kind, ProofKind::Simulated);
    assert!(set.artifacts[0].verified);
    assert_eq!(set.artifacts[0].proof_hash, sha256(b"trained weights"));
}
