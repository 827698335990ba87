//! brief-core: motor de orquestación de transformación documental.
//!
//! Piezas: blackboard versionado append-only, grafo de tareas con aristas
//! derivadas, planner con delta-subgrafo de replanificación, scheduler
//! concurrente con contención de fallas, review gate y trace con replay
//! determinista.
pub mod blackboard;
pub mod capability;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod hashing;
pub mod model;
pub mod planner;
pub mod review;
pub mod scheduler;
pub mod trace;

pub use blackboard::{ArtifactDigest, ArtifactNotice, Blackboard, KeySubscription};
pub use capability::{Capability, CapabilityRegistry, ClassifyCapability, InvokeContext, ReviewCapability};
pub use config::EngineConfig;
pub use engine::{RunEngine, RunOutcome, SeedArtifact};
pub use errors::{classify_error, EngineError, ErrorClass};
pub use graph::{InputSelector, KeyMatch, NodeStatus, TaskGraph, TaskNode};
pub use model::{Artifact, ArtifactDraft, ArtifactId, ArtifactKind, DocumentProfile, ProvenanceNote, RunContext};
pub use planner::{CapabilitySpec, Planner, ReplanOutcome};
pub use review::{ReviewGate, ReviewReport, ReviewVerdict};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use trace::{replay, InMemoryTraceStore, JsonlTraceStore, RunStatus, TraceEntry, TraceEntryKind, TraceRecorder,
                TraceStore};
