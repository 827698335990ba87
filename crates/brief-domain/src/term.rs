//! Glosas de términos técnicos.
//!
//! `TermGloss` asocia un término encontrado en el documento con su
//! explicación en lenguaje llano. El glosario incorporado cubre el
//! vocabulario institucional más frecuente; las capacidades pueden
//! extenderlo con sus propias tablas.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermGloss {
    /// Término tal como aparece en el texto (minúsculas).
    pub term: String,
    /// Explicación en lenguaje llano.
    pub gloss: String,
    /// Identificador del bloque donde se detectó por primera vez.
    pub block_id: String,
    /// Confianza de la glosa en [0,1].
    pub confidence: f64,
}

/// Glosario incorporado: término -> explicación llana.
///
/// BTreeMap para iteración determinista (el orden de las glosas emitidas
/// debe ser estable entre ejecuciones).
pub static BUILTIN_GLOSSARY: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([("amendment", "a formal change to the text of a law or rule"),
                    ("appropriation", "money that a public body sets aside for a specific use"),
                    ("compliance", "following the rules that a law or contract requires"),
                    ("decree", "an official decision issued by an authority"),
                    ("enactment", "the moment a law formally starts to exist"),
                    ("jurisdiction", "the area or subject over which an authority can act"),
                    ("liability", "legal responsibility for damage or debt"),
                    ("ordinance", "a rule issued by a local government"),
                    ("provision", "a single rule or condition inside a legal text"),
                    ("statute", "a written law passed by a legislature"),
                    ("stipulation", "a condition that the parties agreed to"),
                    ("waiver", "giving up a right on purpose")])
});

impl TermGloss {
    /// Busca `term` en el glosario incorporado.
    pub fn from_builtin(term: &str, block_id: &str) -> Option<Self> {
        let lowered = term.to_lowercase();
        BUILTIN_GLOSSARY.get(lowered.as_str())
                        .map(|gloss| TermGloss { term: lowered.clone(),
                                                 gloss: (*gloss).to_string(),
                                                 block_id: block_id.to_string(),
                                                 confidence: 0.9 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        let g = TermGloss::from_builtin("Statute", "b1").expect("known term");
        assert_eq!(g.term, "statute");
        assert_eq!(g.block_id, "b1");
    }

    #[test]
    fn unknown_term_yields_none() {
        assert!(TermGloss::from_builtin("banana", "b1").is_none());
    }
}
