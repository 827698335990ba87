use async_trait::async_trait;
use brief_core::{Artifact, ArtifactDraft, ArtifactKind, Capability, CapabilityRegistry, CapabilitySpec, DocumentProfile,
                 EngineError, InMemoryTraceStore, InputSelector, InvokeContext, NodeStatus, Planner, RunContext,
                 Scheduler, SchedulerConfig, TraceEntryKind, TraceRecorder};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Const {
    kind: &'static str,
}

#[async_trait]
impl Capability for Const {
    async fn invoke(&self, _inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        Ok(vec![ArtifactDraft::new(ArtifactKind::new(self.kind), json!({"v": self.kind}))])
    }
}

struct AlwaysFail;

#[async_trait]
impl Capability for AlwaysFail {
    async fn invoke(&self, _inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        Err(EngineError::AgentExecution("synthetic failure".to_string()))
    }
}

struct Hang;

#[async_trait]
impl Capability for Hang {
    async fn invoke(&self, _inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![])
    }
}

// Mide cuántas invocaciones corren a la vez.
struct TrackPeak {
    kind: &'static str,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Capability for TrackPeak {
    async fn invoke(&self, _inputs: &[Artifact], _ctx: &InvokeContext) -> Result<Vec<ArtifactDraft>, EngineError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![ArtifactDraft::new(ArtifactKind::new(self.kind), json!({"v": 1}))])
    }
}

fn config(max_workers: usize, max_attempts: u32, timeout_ms: u64) -> SchedulerConfig {
    SchedulerConfig { max_workers,
                      max_attempts,
                      node_timeout: Duration::from_millis(timeout_ms),
                      backoff_base: Duration::from_millis(5) }
}

fn fixture<const N: usize>(catalog: Vec<CapabilitySpec>,
                           caps: [(&str, Arc<dyn Capability>); N])
                           -> (brief_core::TaskGraph, Scheduler, RunContext, TraceRecorder<InMemoryTraceStore>, SchedulerConfig) {
    let planner = Planner::new(catalog);
    let graph = planner.plan(&DocumentProfile::new("unit", "en"), &[]).expect("plan");
    let mut registry = CapabilityRegistry::new();
    for (name, cap) in caps {
        registry.register(name, cap);
    }
    let ctx = RunContext::new();
    let recorder = TraceRecorder::new(ctx.run_id, InMemoryTraceStore::default());
    let cfg = config(4, 2, 5_000);
    (graph, Scheduler::new(Arc::new(registry), cfg.clone()), ctx, recorder, cfg)
}

fn running_entries(entries: &[brief_core::TraceEntry], node: &str) -> Vec<u32> {
    entries.iter()
           .filter_map(|e| match &e.kind {
               TraceEntryKind::NodeStateChanged { node_id, status: NodeStatus::Running, attempt, .. } if node_id == node => {
                   Some(*attempt)
               }
               _ => None,
           })
           .collect()
}

#[tokio::test]
async fn failing_node_is_terminal_after_bound_and_dependent_never_runs() {
    let catalog = vec![CapabilitySpec::new("d", "boom").with_output(ArtifactKind::new("x")),
                       CapabilitySpec::new("e", "pass").with_input(InputSelector::any(ArtifactKind::new("x")))
                                                       .with_output(ArtifactKind::new("y"))];
    let (mut graph, scheduler, ctx, mut recorder, _) =
        fixture(catalog, [("boom", Arc::new(AlwaysFail) as Arc<dyn Capability>),
                          ("pass", Arc::new(Const { kind: "y" }))]);

    scheduler.run(&mut graph, &ctx, &mut recorder).await.expect("scheduler finishes");

    assert_eq!(graph.node("d").unwrap().status, NodeStatus::Failed);
    assert_eq!(graph.node("d").unwrap().attempt, 2);
    assert_eq!(graph.node("e").unwrap().status, NodeStatus::Skipped);

    let entries = recorder.entries();
    // exactamente dos intentos registrados para d; e jamás entró a Running
    assert_eq!(running_entries(&entries, "d"), vec![1, 2]);
    assert!(running_entries(&entries, "e").is_empty());
    // el salto a Skipped quedó registrado, no silenciado
    assert!(entries.iter().any(|e| matches!(&e.kind,
        TraceEntryKind::NodeStateChanged { node_id, status: NodeStatus::Skipped, .. } if node_id == "e")));
}

#[tokio::test]
async fn optional_failure_does_not_skip_dependents() {
    let catalog = vec![CapabilitySpec::new("frail", "boom").with_output(ArtifactKind::new("x")).optional(),
                       CapabilitySpec::new("solid", "make_y").with_output(ArtifactKind::new("y")),
                       CapabilitySpec::new("join", "make_z").with_input(InputSelector::any(ArtifactKind::new("x")))
                                                            .with_input(InputSelector::any(ArtifactKind::new("y")))
                                                            .with_output(ArtifactKind::new("z"))];
    let (mut graph, scheduler, ctx, mut recorder, _) =
        fixture(catalog, [("boom", Arc::new(AlwaysFail) as Arc<dyn Capability>),
                          ("make_y", Arc::new(Const { kind: "y" })),
                          ("make_z", Arc::new(Const { kind: "z" }))]);

    scheduler.run(&mut graph, &ctx, &mut recorder).await.expect("scheduler finishes");

    assert_eq!(graph.node("frail").unwrap().status, NodeStatus::Failed);
    // el consumidor corrió igual, degradado (sin el input opcional)
    assert_eq!(graph.node("join").unwrap().status, NodeStatus::Succeeded);
    assert!(ctx.blackboard.has(&brief_core::ArtifactId::new(ArtifactKind::new("z"), "join")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn worker_bound_limits_parallelism() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let catalog = (0..4).map(|i| CapabilitySpec::new(format!("n{i}"), "track").with_output(ArtifactKind::new("t")))
                        .collect::<Vec<_>>();
    let planner = Planner::new(catalog);
    let mut graph = planner.plan(&DocumentProfile::new("unit", "en"), &[]).unwrap();

    let mut registry = CapabilityRegistry::new();
    registry.register("track", Arc::new(TrackPeak { kind: "t",
                                                    current: current.clone(),
                                                    peak: peak.clone() }));
    let scheduler = Scheduler::new(Arc::new(registry), config(2, 1, 5_000));
    let ctx = RunContext::new();
    let mut recorder = TraceRecorder::new(ctx.run_id, InMemoryTraceStore::default());

    scheduler.run(&mut graph, &ctx, &mut recorder).await.expect("scheduler finishes");

    assert!(graph.nodes().all(|n| n.status == NodeStatus::Succeeded));
    assert!(peak.load(Ordering::SeqCst) <= 2, "peak was {}", peak.load(Ordering::SeqCst));
}

#[tokio::test]
async fn timeout_is_recorded_distinctly_and_retried() {
    let catalog = vec![CapabilitySpec::new("slow", "hang").with_output(ArtifactKind::new("x"))];
    let planner = Planner::new(catalog);
    let mut graph = planner.plan(&DocumentProfile::new("unit", "en"), &[]).unwrap();

    let mut registry = CapabilityRegistry::new();
    registry.register("hang", Arc::new(Hang));
    let scheduler = Scheduler::new(Arc::new(registry), config(1, 2, 30));
    let ctx = RunContext::new();
    let mut recorder = TraceRecorder::new(ctx.run_id, InMemoryTraceStore::default());

    scheduler.run(&mut graph, &ctx, &mut recorder).await.expect("scheduler finishes");

    assert_eq!(graph.node("slow").unwrap().status, NodeStatus::TimedOut);
    let entries = recorder.entries();
    let timed_out: Vec<u32> = entries.iter()
                                     .filter_map(|e| match &e.kind {
                                         TraceEntryKind::NodeStateChanged { status: NodeStatus::TimedOut,
                                                                            attempt,
                                                                            error, .. } => {
                                             assert!(matches!(error, Some(EngineError::Timeout(_))));
                                             Some(*attempt)
                                         }
                                         _ => None,
                                     })
                                     .collect();
    assert_eq!(timed_out, vec![1, 2]);
}

#[tokio::test]
async fn cancellation_stops_dispatch_and_keeps_finished_artifacts() {
    let catalog = vec![CapabilitySpec::new("fast", "make_x").with_output(ArtifactKind::new("x")),
                       CapabilitySpec::new("stuck", "hang").with_input(InputSelector::any(ArtifactKind::new("x")))
                                                           .with_output(ArtifactKind::new("y")),
                       CapabilitySpec::new("after", "make_z").with_input(InputSelector::any(ArtifactKind::new("y")))
                                                             .with_output(ArtifactKind::new("z"))];
    let (mut graph, scheduler, ctx, mut recorder, _) =
        fixture(catalog, [("make_x", Arc::new(Const { kind: "x" }) as Arc<dyn Capability>),
                          ("hang", Arc::new(Hang)),
                          ("make_z", Arc::new(Const { kind: "z" }))]);

    let cancel = ctx.cancel.clone();
    let canceller = async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();
    };
    let (run, _) = tokio::join!(scheduler.run(&mut graph, &ctx, &mut recorder), canceller);
    run.expect("scheduler drains after cancellation");

    assert_eq!(graph.node("fast").unwrap().status, NodeStatus::Succeeded);
    assert_eq!(graph.node("stuck").unwrap().status, NodeStatus::Cancelled);
    assert_eq!(graph.node("after").unwrap().status, NodeStatus::Cancelled);
    // lo ya exitoso conserva su artifact
    assert!(ctx.blackboard.has(&brief_core::ArtifactId::new(ArtifactKind::new("x"), "fast")));
    // nadie más entró a Running después de la señal
    assert!(running_entries(&recorder.entries(), "after").is_empty());
}

#[tokio::test]
async fn consumer_running_never_precedes_its_input_writes() {
    let catalog = vec![CapabilitySpec::new("a", "make_x").with_output(ArtifactKind::new("x")),
                       CapabilitySpec::new("b", "make_y").with_output(ArtifactKind::new("y")),
                       CapabilitySpec::new("c", "join").with_input(InputSelector::any(ArtifactKind::new("x")))
                                                       .with_input(InputSelector::any(ArtifactKind::new("y")))
                                                       .with_output(ArtifactKind::new("z"))];
    let (mut graph, scheduler, ctx, mut recorder, _) =
        fixture(catalog, [("make_x", Arc::new(Const { kind: "x" }) as Arc<dyn Capability>),
                          ("make_y", Arc::new(Const { kind: "y" })),
                          ("join", Arc::new(Const { kind: "z" }))]);

    scheduler.run(&mut graph, &ctx, &mut recorder).await.expect("scheduler finishes");

    let entries = recorder.entries();
    let input_writes: Vec<u64> = entries.iter()
                                        .filter_map(|e| match &e.kind {
                                            TraceEntryKind::ArtifactWritten { artifact }
                                                if artifact.key == "a" || artifact.key == "b" => Some(e.seq),
                                            _ => None,
                                        })
                                        .collect();
    let c_running: u64 = entries.iter()
                                .find_map(|e| match &e.kind {
                                    TraceEntryKind::NodeStateChanged { node_id, status: NodeStatus::Running, .. }
                                        if node_id == "c" => Some(e.seq),
                                    _ => None,
                                })
                                .expect("c ran");
    assert_eq!(input_writes.len(), 2);
    assert!(input_writes.iter().all(|seq| *seq < c_running));
}
