//! Blackboard: almacén clave-valor versionado y append-only de la corrida.
//!
//! Contrato:
//! - `put` agrega una revisión nueva para `(kind,key)`; exige que el llamador
//!   traiga `revision == máxima actual + 1` y falla con `StaleWrite` en caso
//!   contrario (versionado optimista: leer `next_revision`, escribir,
//!   reintentar con la expectativa refrescada si alguien se adelantó).
//! - escrituras a claves distintas son independientes; escrituras a la misma
//!   clave se serializan en el lock de entrada del mapa, así el chequeo de
//!   revisión admite a lo sumo un escritor comprometido por número.
//! - las lecturas no bloquean escritores de otras claves y sólo observan
//!   revisiones comprometidas.
//! - cada revisión comprometida emite exactamente un aviso por el canal de
//!   suscripción; un suscriptor rezagado pierde avisos (capacidad acotada) y
//!   debe re-evaluar por consulta directa.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::constants::NOTICE_CHANNEL_CAPACITY;
use crate::errors::EngineError;
use crate::hashing::hash_value;
use crate::model::{Artifact, ArtifactId, ArtifactKind};

/// Aviso de revisión comprometida.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNotice {
    pub id: ArtifactId,
    pub revision: u64,
}

/// Resumen determinista de una revisión, para comparaciones de replay y
/// para el fingerprint de la corrida.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactDigest {
    pub kind: String,
    pub key: String,
    pub revision: u64,
    pub payload_hash: String,
}

#[derive(Debug)]
pub struct Blackboard {
    entries: DashMap<ArtifactId, Vec<Artifact>>,
    notices: broadcast::Sender<ArtifactNotice>,
}

impl Blackboard {
    pub fn new() -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Blackboard { entries: DashMap::new(),
                     notices }
    }

    /// Compromete una revisión nueva. Asigna el hash canónico del payload si
    /// el llamador no lo trae calculado.
    pub fn put(&self, mut artifact: Artifact) -> Result<Artifact, EngineError> {
        if artifact.hash.is_empty() {
            artifact.hash = hash_value(&artifact.payload);
        }
        self.commit(artifact)
    }

    /// Variante de replay: exige que el hash grabado coincida con el
    /// recomputado antes de comprometer (un desajuste delata trace corrupto).
    pub fn restore(&self, artifact: Artifact) -> Result<Artifact, EngineError> {
        let recomputed = hash_value(&artifact.payload);
        if artifact.hash != recomputed {
            return Err(EngineError::TraceCorrupted(format!("artifact ({},{}) rev {} hash mismatch",
                                                           artifact.kind, artifact.key, artifact.revision)));
        }
        self.commit(artifact)
    }

    fn commit(&self, artifact: Artifact) -> Result<Artifact, EngineError> {
        let id = artifact.id();
        let revision = artifact.revision;
        {
            // El guard de la entrada serializa a los escritores de esta clave.
            let mut slot = self.entries.entry(id.clone()).or_default();
            let expected = slot.len() as u64 + 1;
            if revision != expected {
                return Err(EngineError::StaleWrite { kind: id.kind.to_string(),
                                                     key: id.key.clone(),
                                                     expected,
                                                     got: revision });
            }
            slot.push(artifact.clone());
        }
        let _ = self.notices.send(ArtifactNotice { id, revision });
        Ok(artifact)
    }

    /// Lee una revisión concreta, o la última si `revision` es `None`.
    pub fn get(&self, kind: &ArtifactKind, key: &str, revision: Option<u64>) -> Result<Artifact, EngineError> {
        let id = ArtifactId::new(kind.clone(), key);
        let artifact = self.entries.get(&id).and_then(|slot| {
                                                match revision {
                                                    None => slot.last().cloned(),
                                                    Some(r) if r >= 1 => slot.get((r - 1) as usize).cloned(),
                                                    Some(_) => None,
                                                }
                                            });
        artifact.ok_or_else(|| EngineError::NotFound { kind: kind.to_string(),
                                                       key: key.to_string() })
    }

    /// Última revisión comprometida de una identidad, si existe.
    pub fn latest(&self, id: &ArtifactId) -> Option<Artifact> {
        self.entries.get(id).and_then(|slot| slot.last().cloned())
    }

    /// Sondeo no bloqueante de existencia.
    pub fn has(&self, id: &ArtifactId) -> bool {
        self.entries.get(id).map(|slot| !slot.is_empty()).unwrap_or(false)
    }

    pub fn latest_revision(&self, id: &ArtifactId) -> Option<u64> {
        self.entries.get(id).map(|slot| slot.len() as u64).filter(|n| *n > 0)
    }

    /// Revisión que debería traer la próxima escritura (leer-e-incrementar).
    pub fn next_revision(&self, id: &ArtifactId) -> u64 {
        self.latest_revision(id).unwrap_or(0) + 1
    }

    /// Suscripción al flujo de avisos de toda la corrida.
    pub fn subscribe(&self) -> broadcast::Receiver<ArtifactNotice> {
        self.notices.subscribe()
    }

    /// Suscripción filtrada a una identidad concreta.
    pub fn subscribe_to(&self, id: ArtifactId) -> KeySubscription {
        KeySubscription { id,
                          rx: self.notices.subscribe() }
    }

    /// Cantidad de identidades con al menos una revisión.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Listado determinista `(kind, key, revision, payload_hash)` ordenado.
    pub fn digest(&self) -> Vec<ArtifactDigest> {
        let mut out: Vec<ArtifactDigest> = Vec::new();
        for entry in self.entries.iter() {
            for artifact in entry.value() {
                out.push(ArtifactDigest { kind: artifact.kind.to_string(),
                                          key: artifact.key.clone(),
                                          revision: artifact.revision,
                                          payload_hash: artifact.hash.clone() });
            }
        }
        out.sort();
        out
    }
}

impl Default for Blackboard {
    fn default() -> Self {
        Self::new()
    }
}

/// Receptor filtrado: entrega un aviso por revisión nueva de `id`.
pub struct KeySubscription {
    id: ArtifactId,
    rx: broadcast::Receiver<ArtifactNotice>,
}

impl KeySubscription {
    /// Espera el próximo aviso de la identidad suscrita. `None` cuando el
    /// blackboard fue descartado. Un rezago del canal se tolera siguiendo
    /// de largo: el aviso perdido se recupera consultando el blackboard.
    pub async fn recv(&mut self) -> Option<u64> {
        loop {
            match self.rx.recv().await {
                Ok(notice) if notice.id == self.id => return Some(notice.revision),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("blackboard subscription lagged by {} notices", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
