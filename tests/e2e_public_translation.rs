//! Punta a punta del pipeline estándar sobre el motor completo: plan
//! condicionado por perfil, ejecución concurrente, revisión de legibilidad,
//! replanificación mínima y replay del trace.

use std::sync::Arc;

use brief_adapters::artifacts::{kind, EXPLANATIONS, PUBLIC_BRIEF, RAW_DOCUMENT};
use brief_adapters::{standard_planner, standard_registry, ProfileClassifier, ReadabilityReviewer};
use brief_core::trace::replay;
use brief_core::{ArtifactId, DocumentProfile, EngineConfig, NodeStatus, RunEngine, RunStatus, SeedArtifact,
                 TraceEntryKind};
use serde_json::json;

const DENSE_STATUTE: &str = "The comprehensive municipal statute of 1994, promulgated following protracted \
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
documented application procedures.

Additionally, the enactment contemplates graduated transitional accommodation periods, permitting established \
commercial venues to implement progressive acoustic insulation improvements without immediate sanction exposure, \
while simultaneously establishing accelerated administrative adjudication mechanisms addressing reiterated \
noncompliance, culminating ultimately in potential suspension or definitive revocation of operational licenses \
previously granted under antecedent regulatory frameworks.";

const PLAIN_NOTICE: &str = "Public notice for all residents. The pool closes in May. Repairs start that week. \
The works take ten days. The pool reopens in June.

Entry stays free for members. Day passes resume later. Call the city desk for details.";

fn engine_with(reviewer: ReadabilityReviewer, config: &EngineConfig) -> RunEngine<brief_core::InMemoryTraceStore> {
    RunEngine::in_memory(standard_planner(), Arc::new(standard_registry()), Arc::new(reviewer), config)
        .with_classifier(Arc::new(ProfileClassifier))
}

fn seed(text: &str) -> SeedArtifact {
    SeedArtifact::new(kind(RAW_DOCUMENT), "source", json!({"text": text}))
}

#[tokio::test]
async fn dense_statute_self_corrects_in_one_replan() {
    let mut engine = engine_with(ReadabilityReviewer::new(), &EngineConfig::default());
    let outcome = engine.execute_document(DENSE_STATUTE, seed(DENSE_STATUTE)).await.expect("run finishes");

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.replans, 1);
    assert!(outcome.failed_nodes.is_empty());

    let bb = engine.blackboard();
    // el perfil con años habilitó la capa histórica
    assert_eq!(outcome.node_statuses.get("timeline"), Some(&NodeStatus::Succeeded));

    // el delta re-ejecutó explicación y brief; parse y gloss quedaron en rev 1
    assert_eq!(bb.latest_revision(&ArtifactId::new(kind("blocks"), "parse")), Some(1));
    assert_eq!(bb.latest_revision(&ArtifactId::new(kind(EXPLANATIONS), "explain")), Some(2));
    assert_eq!(bb.latest_revision(&ArtifactId::new(kind(PUBLIC_BRIEF), "brief")), Some(2));

    let brief = bb.get(&kind(PUBLIC_BRIEF), "brief", None).unwrap();
    assert_eq!(brief.payload["meta"]["group"], 2);
    let titles: Vec<&str> = brief.payload["sections"].as_array()
                                                     .unwrap()
                                                     .iter()
                                                     .filter_map(|s| s["id"].as_str())
                                                     .collect();
    assert!(titles.contains(&"timeline"));
    assert!(titles.contains(&"key_terms"));

    // exactamente una replanificación registrada, con índice 1
    let replan_indices: Vec<u32> = engine.trace_entries()
                                         .iter()
                                         .filter_map(|e| match &e.kind {
                                             TraceEntryKind::ReplanTriggered { replan_index, .. } => Some(*replan_index),
                                             _ => None,
                                         })
                                         .collect();
    assert_eq!(replan_indices, vec![1]);
}

#[tokio::test]
async fn plain_notice_passes_first_review_without_timeline() {
    let mut engine = engine_with(ReadabilityReviewer::new(), &EngineConfig::default());
    let outcome = engine.execute_document(PLAIN_NOTICE, seed(PLAIN_NOTICE)).await.expect("run finishes");

    assert_eq!(outcome.status, RunStatus::Succeeded);
    assert_eq!(outcome.replans, 0);
    // perfil sin años: la clase histórica ni se planificó
    assert!(!outcome.node_statuses.contains_key("timeline"));

    let brief = engine.blackboard().get(&kind(PUBLIC_BRIEF), "brief", None).unwrap();
    assert_eq!(brief.revision, 1);
}

#[tokio::test]
async fn unreachable_clarity_floor_ends_in_partial_success() {
    let mut config = EngineConfig::default();
    config.max_replans = 2;
    let mut engine = engine_with(ReadabilityReviewer::new().with_clarity_floor(0.999), &config);
    let outcome = engine.execute_document(PLAIN_NOTICE, seed(PLAIN_NOTICE)).await.expect("reported, not fatal");

    assert_eq!(outcome.status, RunStatus::PartialSuccess);
    assert_eq!(outcome.replans, 2);
    // la corrida cerró con el mejor brief disponible
    let brief = engine.blackboard().get(&kind(PUBLIC_BRIEF), "brief", None).unwrap();
    assert_eq!(brief.revision, 3);
}

#[tokio::test]
async fn full_run_trace_replays_to_identical_state() {
    let mut engine = engine_with(ReadabilityReviewer::new(), &EngineConfig::default());
    let outcome = engine.execute_document(DENSE_STATUTE, seed(DENSE_STATUTE)).await.expect("run finishes");

    let summary = replay(&engine.trace_entries()).expect("replay");
    assert_eq!(summary.final_status, Some(RunStatus::Succeeded));
    assert_eq!(summary.replans, outcome.replans);
    assert_eq!(summary.blackboard.digest(), engine.blackboard().digest());
    assert_eq!(summary.node_statuses, outcome.node_statuses);
    assert_eq!(summary.run_fingerprint.as_deref(), Some(outcome.run_fingerprint.as_str()));
}
