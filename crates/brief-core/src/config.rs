//! Configuración de la corrida.
//!
//! Valores por defecto razonables para tests y demos; `from_env` lee las
//! variables `BRIEFFLOW_*` (el binario carga `.env` antes con dotenvy).

use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_MAX_REPLANS;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cota de workers concurrentes del scheduler.
    pub max_workers: usize,
    /// Intentos por nodo antes de la falla terminal.
    pub max_attempts: u32,
    /// Timeout de cada invocación de capacidad.
    pub node_timeout: Duration,
    /// Base del backoff exponencial entre reintentos.
    pub backoff_base: Duration,
    /// Presupuesto de replanificaciones por corrida.
    pub max_replans: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { max_workers: 4,
                       max_attempts: 2,
                       node_timeout: Duration::from_secs(30),
                       backoff_base: Duration::from_millis(50),
                       max_replans: DEFAULT_MAX_REPLANS }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or(default),
        Err(_) => default,
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let base = EngineConfig::default();
        EngineConfig { max_workers: env_parse("BRIEFFLOW_MAX_WORKERS", base.max_workers),
                       max_attempts: env_parse("BRIEFFLOW_MAX_ATTEMPTS", base.max_attempts),
                       node_timeout: Duration::from_millis(env_parse("BRIEFFLOW_NODE_TIMEOUT_MS",
                                                                     base.node_timeout.as_millis() as u64)),
                       backoff_base: Duration::from_millis(env_parse("BRIEFFLOW_BACKOFF_MS",
                                                                     base.backoff_base.as_millis() as u64)),
                       max_replans: env_parse("BRIEFFLOW_MAX_REPLANS", base.max_replans) }
    }
}
