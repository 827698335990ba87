//! Entradas de línea de tiempo.
//!
//! La capa histórica extrae menciones de años del documento y las ordena
//! cronológicamente. Es una capa opcional del pipeline: sólo se planifica
//! cuando el perfil del documento lo amerita.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Año mencionado (rango plausible 1000..=2999).
    pub year: u32,
    /// Bloque donde aparece la mención.
    pub block_id: String,
    /// Fragmento de contexto alrededor de la mención.
    pub context: String,
}

/// Extrae menciones de años de un texto de bloque.
///
/// Determinista: recorre tokens en orden y acepta números de 4 dígitos en
/// el rango plausible. No deduplica entre bloques (eso decide el llamador).
pub fn extract_years(block_id: &str, text: &str) -> Vec<TimelineEntry> {
    let mut entries = Vec::new();
    for token in text.split_whitespace() {
        let cleaned: String = token.chars().filter(|c| c.is_ascii_digit()).collect();
        if cleaned.len() != 4 {
            continue;
        }
        if let Ok(year) = cleaned.parse::<u32>() {
            if (1000..3000).contains(&year) {
                let context: String = text.chars().take(80).collect();
                entries.push(TimelineEntry { year,
                                             block_id: block_id.to_string(),
                                             context });
            }
        }
    }
    entries
}
