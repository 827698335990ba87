//! Scheduler: ejecución concurrente del grafo respetando dependencias.
//!
//! Ejecución topológica estilo Kahn adaptada a correr cada "nivel" en
//! paralelo y a re-sembrar readiness a medida que los artifacts llegan al
//! blackboard (la llegada de datos, no sólo la estructura, habilita nodos).
//!
//! Modelo de suspensión: el loop central se bloquea únicamente esperando
//! workers, avisos del blackboard o la señal de cancelación; nunca hace
//! busy-wait. Cada worker ejecuta UN intento de UNA capacidad bajo timeout;
//! los reintentos los orquesta el loop con backoff exponencial, así cada
//! intento queda registrado como transición propia en el trace.
//!
//! Contención de fallas: una falla terminal de un nodo no opcional lleva a
//! todos sus dependientes transitivos directamente a `Skipped` (registrado,
//! nunca silencioso); el resto del grafo sigue ejecutándose.

use chrono::Utc;
use log::{debug, warn};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;

use crate::capability::{Capability, CapabilityRegistry, InvokeContext};
use crate::config::EngineConfig;
use crate::errors::{classify_error, EngineError, ErrorClass};
use crate::graph::{InputSource, NodeStatus, TaskGraph};
use crate::model::{Artifact, ArtifactDraft, ArtifactId, ProvenanceNote, RunContext};
use crate::trace::{TraceEntryKind, TraceRecorder, TraceStore};

/// Subconjunto de configuración que gobierna la ejecución.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_workers: usize,
    pub max_attempts: u32,
    pub node_timeout: Duration,
    pub backoff_base: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for SchedulerConfig {
    fn from(config: &EngineConfig) -> Self {
        SchedulerConfig { max_workers: config.max_workers.max(1),
                          max_attempts: config.max_attempts.max(1),
                          node_timeout: config.node_timeout,
                          backoff_base: config.backoff_base }
    }
}

/// Mensajes que el loop recibe de sus tareas.
enum WorkerMsg {
    AttemptDone {
        node_id: String,
        attempt: u32,
        result: Result<Vec<ArtifactDraft>, EngineError>,
    },
    RetryDue { node_id: String },
}

pub struct Scheduler {
    registry: Arc<CapabilityRegistry>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(registry: Arc<CapabilityRegistry>, config: SchedulerConfig) -> Self {
        Scheduler { registry, config }
    }

    /// Ejecuta el grafo hasta que no quede ningún nodo `Pending`/`Ready`/
    /// `Running`. Los estados terminales quedan en los nodos del grafo; el
    /// resultado de la corrida lo juzga el llamador.
    pub async fn run<S: TraceStore>(&self,
                                    graph: &mut TaskGraph,
                                    ctx: &RunContext,
                                    recorder: &mut TraceRecorder<S>)
                                    -> Result<(), EngineError> {
        // Resolución única del registro, antes de ejecutar nada: un nombre
        // ausente aborta acá, nunca a mitad de corrida.
        let mut caps: HashMap<String, Arc<dyn Capability>> = HashMap::new();
        for node in graph.nodes() {
            if !node.status.is_terminal() && !caps.contains_key(&node.capability) {
                caps.insert(node.capability.clone(), self.registry.resolve(&node.capability)?);
            }
        }

        let mut tasks: JoinSet<WorkerMsg> = JoinSet::new();
        let mut notices = ctx.blackboard.subscribe();
        let mut waiting_retry: BTreeSet<String> = BTreeSet::new();
        let mut in_flight: usize = 0;

        loop {
            if ctx.cancel.is_cancelled() {
                self.cancel_remaining(graph, recorder)?;
                // Drena lo que estaba en vuelo. Los workers observan el token
                // y cortan; un resultado que igual llegó completo se descarta:
                // pasada la señal ningún intento se compromete.
                while let Some(joined) = tasks.join_next().await {
                    if let Ok(WorkerMsg::AttemptDone { node_id, .. }) = joined {
                        set_status(graph, recorder, &node_id, NodeStatus::Cancelled, None)?;
                    }
                }
                return Ok(());
            }

            promote_ready(graph, ctx, recorder)?;
            in_flight = self.dispatch(graph, ctx, recorder, &caps, &mut tasks, &waiting_retry, in_flight)?;

            if !graph.has_active_nodes() && waiting_retry.is_empty() && tasks.is_empty() {
                return Ok(());
            }
            if tasks.is_empty() {
                return Err(EngineError::Internal("scheduler stalled with active nodes".to_string()));
            }

            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => continue,
                joined = tasks.join_next() => {
                    match joined {
                        Some(Ok(msg)) => {
                            in_flight = self.handle_msg(graph, ctx, recorder, &mut tasks, &mut waiting_retry, in_flight, msg)?;
                        }
                        Some(Err(join_err)) => {
                            return Err(EngineError::Internal(format!("worker task failed: {join_err}")));
                        }
                        None => {}
                    }
                }
                notice = notices.recv() => {
                    match notice {
                        // Un aviso re-evalúa readiness en la próxima vuelta
                        // (p.ej. semillas escritas por fuera del scheduler).
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("scheduler lagged {} blackboard notices", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {}
                    }
                }
            }
        }
    }

    /// Despacha todo nodo `Ready` mientras haya cupo de workers.
    fn dispatch<S: TraceStore>(&self,
                               graph: &mut TaskGraph,
                               ctx: &RunContext,
                               recorder: &mut TraceRecorder<S>,
                               caps: &HashMap<String, Arc<dyn Capability>>,
                               tasks: &mut JoinSet<WorkerMsg>,
                               waiting_retry: &BTreeSet<String>,
                               mut in_flight: usize)
                               -> Result<usize, EngineError> {
        for id in graph.ids() {
            if in_flight >= self.config.max_workers {
                break;
            }
            let ready = graph.node(&id)
                             .map(|n| n.status == NodeStatus::Ready && !waiting_retry.contains(&id))
                             .unwrap_or(false);
            if !ready {
                continue;
            }

            let inputs = collect_inputs(graph, ctx, &id);
            let (capability_name, params, revision_group) = match graph.node(&id) {
                Some(n) => (n.capability.clone(), n.params.clone(), n.revision_group),
                None => continue,
            };
            let capability = caps.get(&capability_name)
                                 .cloned()
                                 .ok_or_else(|| EngineError::UnknownCapability(capability_name.clone()))?;

            let attempt = match graph.node_mut(&id) {
                Some(node) => {
                    node.attempt += 1;
                    node.status = NodeStatus::Running;
                    node.attempt
                }
                None => continue,
            };
            record_state(recorder, graph, &id, None)?;
            debug!("dispatch node '{}' attempt {} ({} inputs)", id, attempt, inputs.len());

            let invoke_ctx = InvokeContext { node_id: id.clone(),
                                             params,
                                             attempt,
                                             revision_group };
            let timeout = self.config.node_timeout;
            let cancel = ctx.cancel.clone();
            let node_id = id.clone();
            tasks.spawn(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(EngineError::Cancelled),
                    invoked = tokio::time::timeout(timeout, capability.invoke(&inputs, &invoke_ctx)) => {
                        match invoked {
                            Ok(outcome) => outcome,
                            Err(_elapsed) => Err(EngineError::Timeout(timeout.as_millis() as u64)),
                        }
                    }
                };
                WorkerMsg::AttemptDone { node_id, attempt, result }
            });
            in_flight += 1;
        }
        Ok(in_flight)
    }

    fn handle_msg<S: TraceStore>(&self,
                                 graph: &mut TaskGraph,
                                 ctx: &RunContext,
                                 recorder: &mut TraceRecorder<S>,
                                 tasks: &mut JoinSet<WorkerMsg>,
                                 waiting_retry: &mut BTreeSet<String>,
                                 mut in_flight: usize,
                                 msg: WorkerMsg)
                                 -> Result<usize, EngineError> {
        match msg {
            WorkerMsg::RetryDue { node_id } => {
                waiting_retry.remove(&node_id);
            }
            WorkerMsg::AttemptDone { node_id, attempt, result } => {
                in_flight = in_flight.saturating_sub(1);
                match result {
                    Ok(drafts) => match self.commit_outputs(graph, ctx, recorder, &node_id, drafts) {
                        Ok(()) => {
                            set_status(graph, recorder, &node_id, NodeStatus::Succeeded, None)?;
                        }
                        Err(e) if classify_error(&e) == ErrorClass::Retryable => {
                            self.fail_attempt(graph, recorder, tasks, waiting_retry, &node_id, attempt, e)?;
                        }
                        Err(e) => return Err(e),
                    },
                    Err(EngineError::Cancelled) => {
                        set_status(graph, recorder, &node_id, NodeStatus::Cancelled, None)?;
                    }
                    Err(e) => {
                        // Cualquier falla de capacidad queda contenida en el
                        // borde del nodo; lo no reintentable es terminal ya.
                        self.fail_attempt(graph, recorder, tasks, waiting_retry, &node_id, attempt, e)?;
                    }
                }
            }
        }
        Ok(in_flight)
    }

    /// Registra un intento fallido y decide entre reintento con backoff o
    /// falla terminal con propagación de `Skipped`.
    fn fail_attempt<S: TraceStore>(&self,
                                   graph: &mut TaskGraph,
                                   recorder: &mut TraceRecorder<S>,
                                   tasks: &mut JoinSet<WorkerMsg>,
                                   waiting_retry: &mut BTreeSet<String>,
                                   node_id: &str,
                                   attempt: u32,
                                   error: EngineError)
                                   -> Result<(), EngineError> {
        // TimedOut se registra distinto de Failed para diagnóstico, con la
        // misma política de reintentos.
        let failed_status = if matches!(error, EngineError::Timeout(_)) {
            NodeStatus::TimedOut
        } else {
            NodeStatus::Failed
        };
        let retryable = classify_error(&error) == ErrorClass::Retryable;
        warn!("node '{}' attempt {} failed: {}", node_id, attempt, error);
        set_status(graph, recorder, node_id, failed_status, Some(error))?;

        if retryable && attempt < self.config.max_attempts {
            set_status(graph, recorder, node_id, NodeStatus::Ready, None)?;
            waiting_retry.insert(node_id.to_string());
            let exp = attempt.saturating_sub(1).min(16);
            let delay = self.config.backoff_base.saturating_mul(2u32.pow(exp));
            let id = node_id.to_string();
            tasks.spawn(async move {
                tokio::time::sleep(delay).await;
                WorkerMsg::RetryDue { node_id: id }
            });
            return Ok(());
        }

        let optional = graph.node(node_id).map(|n| n.optional).unwrap_or(false);
        if !optional {
            skip_dependents(graph, recorder, node_id)?;
        }
        Ok(())
    }

    /// Compromete las salidas de un nodo exitoso: valida el contrato
    /// declarado, asigna clave (id del productor) y revisión optimista, y
    /// registra cada revisión en el trace antes de habilitar consumidores.
    fn commit_outputs<S: TraceStore>(&self,
                                     graph: &TaskGraph,
                                     ctx: &RunContext,
                                     recorder: &mut TraceRecorder<S>,
                                     node_id: &str,
                                     drafts: Vec<ArtifactDraft>)
                                     -> Result<(), EngineError> {
        let node = graph.node(node_id)
                        .ok_or_else(|| EngineError::Internal(format!("unknown node '{node_id}'")))?;
        for draft in &drafts {
            if !node.declared_outputs.contains(&draft.kind) {
                return Err(EngineError::SchemaValidation(format!("node '{}' produced undeclared kind '{}'",
                                                                 node_id, draft.kind)));
            }
        }
        let attempt = node.attempt;
        let revision_group = node.revision_group;

        for draft in drafts {
            let id = ArtifactId::new(draft.kind.clone(), node_id);
            let note = draft.note
                            .clone()
                            .unwrap_or_else(|| format!("attempt {attempt}, group {revision_group}"));
            let mut artifact = Artifact { kind: draft.kind,
                                          key: node_id.to_string(),
                                          schema_version: draft.schema_version,
                                          revision: ctx.blackboard.next_revision(&id),
                                          payload: draft.payload,
                                          hash: String::new(),
                                          confidence: draft.confidence,
                                          provenance: vec![ProvenanceNote { produced_by: node_id.to_string(),
                                                                            at: Utc::now(),
                                                                            note: Some(note) }] };
            // Escritura optimista: ante StaleWrite se refresca la revisión
            // esperada y se reintenta.
            let committed = loop {
                match ctx.blackboard.put(artifact.clone()) {
                    Ok(committed) => break committed,
                    Err(EngineError::StaleWrite { expected, .. }) => {
                        warn!("stale write on {}: retrying with revision {}", id, expected);
                        artifact.revision = expected;
                    }
                    Err(e) => return Err(e),
                }
            };
            recorder.record(TraceEntryKind::ArtifactWritten { artifact: committed })?;
        }
        Ok(())
    }

    fn cancel_remaining<S: TraceStore>(&self,
                                       graph: &mut TaskGraph,
                                       recorder: &mut TraceRecorder<S>)
                                       -> Result<(), EngineError> {
        for id in graph.ids() {
            let pending = graph.node(&id)
                               .map(|n| matches!(n.status, NodeStatus::Pending | NodeStatus::Ready))
                               .unwrap_or(false);
            if pending {
                set_status(graph, recorder, &id, NodeStatus::Cancelled, None)?;
            }
        }
        Ok(())
    }
}

/// Promueve a `Ready` todo nodo `Pending` con sus inputs satisfechos.
fn promote_ready<S: TraceStore>(graph: &mut TaskGraph,
                                ctx: &RunContext,
                                recorder: &mut TraceRecorder<S>)
                                -> Result<(), EngineError> {
    for id in graph.ids() {
        let pending = graph.node(&id).map(|n| n.status == NodeStatus::Pending).unwrap_or(false);
        if pending && inputs_satisfied(graph, ctx, &id) {
            set_status(graph, recorder, &id, NodeStatus::Ready, None)?;
        }
    }
    Ok(())
}

/// Un input está satisfecho cuando cada origen resuelto lo está:
/// - productor: terminó `Succeeded` y su artifact está comprometido; un
///   productor opcional con falla terminal cuenta como satisfecho-ausente;
/// - semilla: presente en el blackboard.
///
/// Nota replan: un productor del delta vuelve a `Pending`, así sus
/// consumidores esperan la revisión nueva en lugar de consumir la vieja.
fn inputs_satisfied(graph: &TaskGraph, ctx: &RunContext, id: &str) -> bool {
    graph.resolved_inputs(id).iter().all(|input| {
        input.sources.iter().all(|source| match source {
            InputSource::Producer(producer) => match graph.node(producer) {
                Some(p) if p.status == NodeStatus::Succeeded => {
                    ctx.blackboard.has(&ArtifactId::new(input.kind.clone(), producer.clone()))
                }
                Some(p) => p.optional && p.status.is_terminal_failure(),
                None => false,
            },
            InputSource::Seed(seed_id) => ctx.blackboard.has(seed_id),
        })
    })
}

/// Junta la última revisión de cada input presente. Los orígenes ausentes
/// (productor opcional fallido) simplemente no aportan.
fn collect_inputs(graph: &TaskGraph, ctx: &RunContext, id: &str) -> Vec<Artifact> {
    let mut inputs = Vec::new();
    for resolved in graph.resolved_inputs(id) {
        for source in &resolved.sources {
            let artifact = match source {
                InputSource::Producer(p) => ctx.blackboard.latest(&ArtifactId::new(resolved.kind.clone(), p.clone())),
                InputSource::Seed(seed_id) => ctx.blackboard.latest(seed_id),
            };
            if let Some(artifact) = artifact {
                inputs.push(artifact);
            }
        }
    }
    inputs
}

/// Lleva todos los dependientes transitivos aún no ejecutados a `Skipped`.
fn skip_dependents<S: TraceStore>(graph: &mut TaskGraph,
                                  recorder: &mut TraceRecorder<S>,
                                  origin: &str)
                                  -> Result<(), EngineError> {
    for dependent in graph.transitive_dependents(origin) {
        let waiting = graph.node(&dependent)
                           .map(|n| matches!(n.status, NodeStatus::Pending | NodeStatus::Ready))
                           .unwrap_or(false);
        if waiting {
            warn!("node '{}' skipped: transitive producer '{}' failed", dependent, origin);
            set_status(graph, recorder, &dependent, NodeStatus::Skipped, None)?;
        }
    }
    Ok(())
}

fn set_status<S: TraceStore>(graph: &mut TaskGraph,
                             recorder: &mut TraceRecorder<S>,
                             id: &str,
                             status: NodeStatus,
                             error: Option<EngineError>)
                             -> Result<(), EngineError> {
    if let Some(node) = graph.node_mut(id) {
        node.status = status;
    }
    record_state(recorder, graph, id, error)
}

fn record_state<S: TraceStore>(recorder: &mut TraceRecorder<S>,
                               graph: &TaskGraph,
                               id: &str,
                               error: Option<EngineError>)
                               -> Result<(), EngineError> {
    if let Some(node) = graph.node(id) {
        recorder.record(TraceEntryKind::NodeStateChanged { node_id: id.to_string(),
                                                           status: node.status,
                                                           attempt: node.attempt,
                                                           revision_group: node.revision_group,
                                                           error })?;
    }
    Ok(())
}
