//! Bloques parseados del documento.
//!
//! Un `ParsedBlock` es la unidad mínima que consumen las capacidades de
//! transformación: un párrafo (o segmento equivalente) con identidad
//! estable (`id` secuencial) y su posición en el texto original.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedBlock {
    /// Identificador estable dentro del documento ("b1", "b2", ...).
    pub id: String,
    /// Texto del bloque ya normalizado (sin espacios sobrantes).
    pub text: String,
    /// Orden de aparición (0-based).
    pub order: usize,
    /// Offset de inicio en el texto original, en chars.
    pub start: usize,
}

/// Divide un texto en bloques tipo párrafo.
///
/// Reglas deterministas:
/// - separador: una o más líneas en blanco;
/// - bloques con menos de `min_chars` caracteres útiles se descartan;
/// - los ids se asignan en orden de aparición ("b1", "b2", ...).
pub fn split_into_blocks(text: &str, min_chars: usize) -> Vec<ParsedBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0usize;
    let mut order = 0usize;
    for raw in text.split("\n\n") {
        let start = cursor;
        cursor += raw.chars().count() + 2;
        let trimmed = raw.trim();
        if trimmed.chars().count() < min_chars {
            continue;
        }
        order += 1;
        blocks.push(ParsedBlock { id: format!("b{}", order),
                                  text: trimmed.to_string(),
                                  order: order - 1,
                                  start });
    }
    blocks
}
