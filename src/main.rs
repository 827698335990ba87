//! Demo de punta a punta: clasifica un documento, corre el pipeline de
//! traducción pública con revisión y replanificación, y verifica el replay
//! del trace contra el estado vivo.

use std::path::Path;
use std::sync::Arc;

use brief_adapters::artifacts::{kind, PUBLIC_BRIEF, RAW_DOCUMENT};
use brief_adapters::{standard_planner, standard_registry, ProfileClassifier, ReadabilityReviewer};
use brief_core::trace::{read_trace_file, replay};
use brief_core::{EngineConfig, EngineError, JsonlTraceStore, RunEngine, SeedArtifact};
use serde_json::json;
use uuid::Uuid;

const SAMPLE_DOCUMENT: &str = "The comprehensive municipal statute of 1994, promulgated following protracted \
deliberative proceedings, notwithstanding numerous procedural objections raised by commercial stakeholders, \
establishes substantially diminished permissible acoustic emission thresholds throughout residential districts, \
institutes progressively escalating monetary sanctions for repeated violations, mandates periodic compliance \
verification procedures applicable to every commercial establishment, and authorizes municipal inspectors to \
conduct unannounced evaluations of acoustic insulation infrastructure.

Furthermore, the aforementioned provision, amended in 2011, incorporating recommendations submitted by \
consultative neighborhood committees, delineates overlapping jurisdictional responsibilities across municipal \
enforcement departments, prescribes exhaustive documentation requirements governing every individual enforcement \
action, contemplates narrowly circumscribed discretionary exemptions for temporary cultural celebrations, and \
conditions every such exemption upon preliminary administrative authorization obtained through formally \
documented application procedures.";

async fn run_demo() -> Result<(), EngineError> {
    let config = EngineConfig::from_env();

    let trace_dir = Path::new("traces");
    std::fs::create_dir_all(trace_dir)
        .map_err(|e| EngineError::Internal(format!("trace dir: {e}")))?;
    let run_id = Uuid::new_v4();
    let store = JsonlTraceStore::create(trace_dir, run_id)?;
    let trace_path = store.path().to_path_buf();

    let mut engine = RunEngine::new(store,
                                    standard_planner(),
                                    Arc::new(standard_registry()),
                                    Arc::new(ReadabilityReviewer::new()),
                                    &config).with_run_id(run_id)
                                            .with_classifier(Arc::new(ProfileClassifier));

    let seed = SeedArtifact::new(kind(RAW_DOCUMENT), "source", json!({"text": SAMPLE_DOCUMENT}));
    let outcome = engine.execute_document(SAMPLE_DOCUMENT, seed).await?;

    println!("Corrida {}: {:?} tras {} replanificación(es)", outcome.run_id, outcome.status, outcome.replans);
    for (node, status) in &outcome.node_statuses {
        println!("  {:<10} {:?}", node, status);
    }

    let brief = engine.blackboard().get(&kind(PUBLIC_BRIEF), "brief", None)?;
    println!("Brief (rev {}): {}", brief.revision, brief.payload["title"]);
    if let Some(sections) = brief.payload["sections"].as_array() {
        for section in sections {
            println!("  - {}", section["title"]);
        }
    }
    println!("Fingerprint de la corrida: {}", outcome.run_fingerprint);

    // Verificación de replay: el archivo reconstruye el mismo estado final.
    let live_digest = engine.blackboard().digest();
    let entries = read_trace_file(&trace_path)?;
    let summary = replay(&entries)?;
    assert_eq!(summary.blackboard.digest(), live_digest, "replay must match live state");
    println!("Replay verificado: {} entradas, {} artifacts", entries.len(), summary.blackboard.digest().len());
    println!("Trace: {}", trace_path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::init();

    if let Err(e) = run_demo().await {
        eprintln!("[briefflow] run failed: {e}");
        std::process::exit(1);
    }
}
