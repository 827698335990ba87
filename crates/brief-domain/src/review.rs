//! Criterios de revisión con puntajes calibrados.
//!
//! `ReviewCriteria` es el detalle dimensional que un revisor adjunta a su
//! veredicto. Cada dimensión vive en [0,1]; el agregado `overall` es el
//! promedio simple (las dimensiones pesan igual por diseño del revisor de
//! referencia, no del núcleo).

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewCriteria {
    pub accuracy: f64,
    pub clarity: f64,
    pub completeness: f64,
    pub safety: f64,
}

impl ReviewCriteria {
    /// Construye criterios validando que cada dimensión esté en [0,1].
    pub fn new(accuracy: f64, clarity: f64, completeness: f64, safety: f64) -> Result<Self, DomainError> {
        for (name, v) in [("accuracy", accuracy), ("clarity", clarity), ("completeness", completeness), ("safety", safety)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(DomainError::ValidationError(format!("Criterion {} out of [0,1]: {}", name, v)));
            }
        }
        Ok(ReviewCriteria { accuracy, clarity, completeness, safety })
    }

    /// Promedio simple de las cuatro dimensiones.
    pub fn overall(&self) -> f64 {
        (self.accuracy + self.clarity + self.completeness + self.safety) / 4.0
    }
}
