//! Revisor de legibilidad.
//!
//! El núcleo sólo consume el veredicto escalar-más-detalle; todo el
//! criterio de puntaje vive acá. La claridad sale de la métrica de
//! legibilidad del brief; por debajo del piso, el veredicto es deficiente y
//! nombra tanto al brief como a su productor de explicaciones (la claridad
//! se arregla re-explicando, no re-armando el mismo brief).

use async_trait::async_trait;
use serde_json::json;

use crate::artifacts::{decode_payload, EXPLANATIONS, PUBLIC_BRIEF};
use brief_core::{Artifact, ArtifactId, ArtifactKind, EngineError, ReviewCapability, ReviewReport};
use brief_domain::{readability_score, PublicBrief, ReviewCriteria};

pub struct ReadabilityReviewer {
    clarity_floor: f64,
    explain_target: ArtifactId,
}

impl ReadabilityReviewer {
    pub fn new() -> Self {
        ReadabilityReviewer { clarity_floor: 0.55,
                              explain_target: ArtifactId::new(ArtifactKind::new(EXPLANATIONS), "explain") }
    }

    pub fn with_clarity_floor(mut self, floor: f64) -> Self {
        self.clarity_floor = floor;
        self
    }

    /// Identidad del productor de explicaciones a señalar cuando la claridad
    /// no alcanza (depende del catálogo en uso).
    pub fn with_explain_target(mut self, target: ArtifactId) -> Self {
        self.explain_target = target;
        self
    }
}

impl Default for ReadabilityReviewer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReviewCapability for ReadabilityReviewer {
    async fn review(&self, artifacts: &[Artifact]) -> Result<ReviewReport, EngineError> {
        let brief_artifact = artifacts.iter()
                                      .find(|a| a.kind.as_str() == PUBLIC_BRIEF)
                                      .ok_or_else(|| EngineError::AgentExecution("no brief artifact to review".to_string()))?;
        let brief: PublicBrief = decode_payload(brief_artifact)?;

        let clarity = readability_score(&brief.full_text());
        let completeness = if brief.sections.len() >= 3 { 0.9 } else { 0.7 };
        let criteria = ReviewCriteria::new(0.9, clarity, completeness, 1.0)
            .map_err(|e| EngineError::AgentExecution(format!("criteria: {e}")))?;

        let detail = json!({
            "criteria": criteria,
            "overall": criteria.overall(),
            "clarity_floor": self.clarity_floor,
        });

        if clarity < self.clarity_floor {
            log::debug!("brief clarity {:.2} below floor {:.2}: deficient", clarity, self.clarity_floor);
            let mut detail = detail;
            detail["comments"] = json!(["Sentences are too long for a general audience."]);
            detail["actions"] = json!(["Split long sentences.", "Prefer common words over institutional vocabulary."]);
            return Ok(ReviewReport::deficient(vec![brief_artifact.id(), self.explain_target.clone()], detail));
        }
        Ok(ReviewReport::approved(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brief_core::ReviewVerdict;
    use serde_json::json;

    fn brief_artifact(summary: &str, deep: &str) -> Artifact {
        let payload = json!({
            "title": "A rule",
            "summary": summary,
            "sections": [
                {"id": "summary", "title": "Summary", "content": summary},
                {"id": "deep_dive", "title": "In depth", "content": deep},
                {"id": "key_terms", "title": "Key terms", "content": "statute: a written law."}
            ],
            "meta": {}
        });
        Artifact { kind: ArtifactKind::new(PUBLIC_BRIEF),
                   key: "brief".to_string(),
                   schema_version: 1,
                   revision: 1,
                   payload,
                   hash: "h".to_string(),
                   confidence: None,
                   provenance: Vec::new() }
    }

    #[tokio::test]
    async fn plain_brief_is_approved() {
        let report = ReadabilityReviewer::new().review(&[brief_artifact("The rule is new. It starts in May.",
                                                                        "Fines go up. Limits drop at night.")])
                                               .await
                                               .unwrap();
        assert_eq!(report.verdict, ReviewVerdict::Approved);
        assert!(report.deficient.is_empty());
    }

    #[tokio::test]
    async fn dense_brief_is_deficient_and_names_producers() {
        let dense = "Notwithstanding heretofore promulgated administrative determinations, jurisdictional \
                     prerequisites necessitate comprehensive documentation accompanying every individualized \
                     adjudicatory disposition rendered pursuant to the enabling instrument as amended";
        let report = ReadabilityReviewer::new().review(&[brief_artifact(dense, dense)]).await.unwrap();
        assert_eq!(report.verdict, ReviewVerdict::Deficient);
        let keys: Vec<&str> = report.deficient.iter().map(|id| id.key.as_str()).collect();
        assert_eq!(keys, vec!["brief", "explain"]);
        assert!(report.detail["actions"].is_array());
    }

    #[tokio::test]
    async fn missing_brief_fails_fast() {
        let err = ReadabilityReviewer::new().review(&[]).await.unwrap_err();
        assert!(matches!(err, EngineError::AgentExecution(_)));
    }
}
