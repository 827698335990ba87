//! Almacenes de trace append-only y el recorder por corrida.

use chrono::Utc;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::types::{TraceEntry, TraceEntryKind};
use crate::errors::EngineError;

/// Almacenamiento de entradas append-only.
pub trait TraceStore {
    /// Agrega una entrada a partir de su kind y devuelve la entrada completa
    /// (con seq y ts asignados).
    fn append_kind(&mut self, run_id: Uuid, kind: TraceEntryKind) -> Result<TraceEntry, EngineError>;
    /// Lista las entradas de una corrida (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<TraceEntry>;
}

pub struct InMemoryTraceStore {
    pub inner: HashMap<Uuid, Vec<TraceEntry>>,
}

impl Default for InMemoryTraceStore {
    fn default() -> Self {
        InMemoryTraceStore { inner: HashMap::new() }
    }
}

impl TraceStore for InMemoryTraceStore {
    fn append_kind(&mut self, run_id: Uuid, kind: TraceEntryKind) -> Result<TraceEntry, EngineError> {
        let entries = self.inner.entry(run_id).or_insert_with(Vec::new);
        let entry = TraceEntry { seq: entries.len() as u64,
                                 run_id,
                                 kind,
                                 ts: Utc::now() };
        entries.push(entry.clone());
        Ok(entry)
    }

    fn list(&self, run_id: Uuid) -> Vec<TraceEntry> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}

/// Store respaldado por un archivo JSONL: un registro serializado por línea,
/// flush en cada append (formato apto para append, sin offsets cruzados).
/// Mantiene una copia en memoria para `list`; el archivo es la vista durable
/// que lee `read_trace_file` en replay.
pub struct JsonlTraceStore {
    path: PathBuf,
    writer: BufWriter<File>,
    cache: HashMap<Uuid, Vec<TraceEntry>>,
}

impl JsonlTraceStore {
    /// Crea el archivo de trace de una corrida dentro de `dir`, nombrado por
    /// id de corrida y timestamp.
    pub fn create(dir: &Path, run_id: Uuid) -> Result<Self, EngineError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S");
        let path = dir.join(format!("{}-{}.trace.jsonl", run_id, stamp));
        Self::open(path)
    }

    /// Abre (o crea) un archivo de trace concreto en modo append.
    pub fn open(path: PathBuf) -> Result<Self, EngineError> {
        let file = OpenOptions::new().create(true)
                                     .append(true)
                                     .open(&path)
                                     .map_err(|e| EngineError::Internal(format!("trace file {}: {e}", path.display())))?;
        Ok(JsonlTraceStore { path,
                             writer: BufWriter::new(file),
                             cache: HashMap::new() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceStore for JsonlTraceStore {
    fn append_kind(&mut self, run_id: Uuid, kind: TraceEntryKind) -> Result<TraceEntry, EngineError> {
        let entries = self.cache.entry(run_id).or_insert_with(Vec::new);
        let entry = TraceEntry { seq: entries.len() as u64,
                                 run_id,
                                 kind,
                                 ts: Utc::now() };
        let line = serde_json::to_string(&entry)
            .map_err(|e| EngineError::Internal(format!("trace serialize: {e}")))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(|e| EngineError::Internal(format!("trace write {}: {e}", self.path.display())))?;
        entries.push(entry.clone());
        Ok(entry)
    }

    fn list(&self, run_id: Uuid) -> Vec<TraceEntry> {
        self.cache.get(&run_id).cloned().unwrap_or_default()
    }
}

/// Escritor único de la bitácora de una corrida.
///
/// Observador puro: planner, scheduler y review gate nunca lo consultan; el
/// motor registra cada transición a medida que ocurre, en orden real.
pub struct TraceRecorder<S: TraceStore> {
    run_id: Uuid,
    store: S,
}

impl<S: TraceStore> TraceRecorder<S> {
    pub fn new(run_id: Uuid, store: S) -> Self {
        TraceRecorder { run_id, store }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Reapunta el recorder a otra corrida (antes de registrar nada).
    pub fn set_run_id(&mut self, run_id: Uuid) {
        self.run_id = run_id;
    }

    pub fn record(&mut self, kind: TraceEntryKind) -> Result<TraceEntry, EngineError> {
        self.store.append_kind(self.run_id, kind)
    }

    pub fn entries(&self) -> Vec<TraceEntry> {
        self.store.list(self.run_id)
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_store_assigns_contiguous_seqs() {
        let mut store = InMemoryTraceStore::default();
        let run = Uuid::new_v4();
        let a = store.append_kind(run, TraceEntryKind::RunCancelled).unwrap();
        let b = store.append_kind(run, TraceEntryKind::RunCancelled).unwrap();
        assert_eq!(a.seq, 0);
        assert_eq!(b.seq, 1);
        assert_eq!(store.list(run).len(), 2);
    }

    #[test]
    fn recorder_scopes_entries_to_its_run() {
        let mut rec = TraceRecorder::new(Uuid::new_v4(), InMemoryTraceStore::default());
        rec.record(TraceEntryKind::RunCancelled).unwrap();
        assert_eq!(rec.entries().len(), 1);
    }
}
