//! Curated high-risk clinical term lexicon and the alerting pass over it.
//!
//! Terms are matched as case-insensitive substrings (not stemmed) because
//! danger signs are often multi-word phrases ("refer immediately") that
//! stemming would fragment and miss. Grounded in
//! `original_source/extraction/src/database.py::HIGH_RISK_TERMS`.

use crate::types::{HighRiskAlert, HighRiskTermDef, SearchResult, Severity};

/// The complete curated lexicon. This is the full ~50-term list, not a
/// sample — it is part of the externally-consumable specification.
pub const HIGH_RISK_TERMS: &[HighRiskTermDef] = &[
    // General danger signs
    term("danger sign", "General", Severity::High),
    term("danger signs", "General", Severity::High),
    term("life-threatening", "General", Severity::High),
    term("life threatening", "General", Severity::High),
    term("severe", "General", Severity::Medium),
    term("high fever", "General", Severity::Medium),
    // Referral indicators
    term("refer immediately", "Referral", Severity::High),
    term("emergency referral", "Referral", Severity::High),
    term("refer to health facility", "Referral", Severity::Medium),
    term("refer to hospital", "Referral", Severity::High),
    term("urgent referral", "Referral", Severity::High),
    // Neurological
    term("convulsions", "Neurological", Severity::High),
    term("convulsion", "Neurological", Severity::High),
    term("unconscious", "Neurological", Severity::High),
    term("loss of consciousness", "Neurological", Severity::High),
    term("severe headache", "Neurological", Severity::Medium),
    term("altered consciousness", "Neurological", Severity::High),
    term("coma", "Neurological", Severity::High),
    // Pediatric
    term("not able to drink", "Pediatric", Severity::High),
    term("unable to drink", "Pediatric", Severity::High),
    term("not able to breastfeed", "Pediatric", Severity::High),
    term("unable to breastfeed", "Pediatric", Severity::High),
    term("severe malnutrition", "Pediatric", Severity::High),
    term("not able to eat", "Pediatric", Severity::High),
    // Respiratory
    term("severe pneumonia", "Respiratory", Severity::High),
    term("chest indrawing", "Respiratory", Severity::High),
    term("difficulty breathing", "Respiratory", Severity::High),
    term("respiratory distress", "Respiratory", Severity::High),
    term("stridor", "Respiratory", Severity::High),
    // Maternal
    term("vaginal bleeding", "Maternal", Severity::High),
    term("fits in pregnancy", "Maternal", Severity::High),
    term("severe headache in pregnancy", "Maternal", Severity::High),
    term("blurred vision in pregnancy", "Maternal", Severity::High),
    term("eclampsia", "Maternal", Severity::High),
    term("pre-eclampsia", "Maternal", Severity::High),
    term("postpartum hemorrhage", "Maternal", Severity::High),
    // Dehydration
    term("severe dehydration", "Dehydration", Severity::High),
    term("signs of dehydration", "Dehydration", Severity::Medium),
    // Hematologic
    term("severe anaemia", "Hematologic", Severity::High),
    term("severe anemia", "Hematologic", Severity::High),
    // Gastrointestinal
    term("persistent vomiting", "Gastrointestinal", Severity::High),
    term("bloody diarrhoea", "Gastrointestinal", Severity::High),
    term("bloody diarrhea", "Gastrointestinal", Severity::High),
    // Scope limitations
    term("do not treat", "Scope", Severity::High),
    term("beyond scope", "Scope", Severity::Medium),
    term("requires specialist", "Scope", Severity::Medium),
];

const fn term(term: &'static str, category: &'static str, severity: Severity) -> HighRiskTermDef {
    HighRiskTermDef {
        term,
        category,
        severity,
    }
}

/// Process-wide, read-only view of the lexicon, loaded once at startup.
/// Entries may come from the static [`HIGH_RISK_TERMS`] list or from the
/// store's `high_risk_terms` table (whichever was populated at ingestion).
#[derive(Debug, Clone)]
pub struct HighRiskLexicon {
    terms: Vec<HighRiskTermDef>,
}

impl HighRiskLexicon {
    pub fn curated() -> Self {
        Self {
            terms: HIGH_RISK_TERMS.to_vec(),
        }
    }

    pub fn from_terms(terms: Vec<HighRiskTermDef>) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &[HighRiskTermDef] {
        &self.terms
    }

    /// Scans the concatenated, lower-cased content of `results` for lexicon
    /// hits. Each distinct term fires at most once, even across many
    /// matches or many results. High severity sorts before Medium; within
    /// a severity, by term (stable).
    pub fn detect(&self, results: &[SearchResult]) -> Vec<HighRiskAlert> {
        let haystack = results
            .iter()
            .map(|r| r.content.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut alerts: Vec<HighRiskAlert> = self
            .terms
            .iter()
            .filter(|t| haystack.contains(&t.term.to_lowercase()))
            .map(|t| HighRiskAlert {
                term: t.term.to_string(),
                category: t.category.to_string(),
                severity: t.severity,
            })
            .collect();

        alerts.sort_by(|a, b| {
            let sev_key = |s: Severity| if s == Severity::High { 0 } else { 1 };
            sev_key(a.severity)
                .cmp(&sev_key(b.severity))
                .then_with(|| a.term.cmp(&b.term))
        });

        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn result(content: &str) -> SearchResult {
        SearchResult {
            chunk_id: "c1".into(),
            content: content.into(),
            headings: vec![],
            page_number: Some(1),
            score: 1.0,
            source: Source::Keyword,
        }
    }

    #[test]
    fn detects_known_term() {
        let lexicon = HighRiskLexicon::curated();
        let alerts = lexicon.detect(&[result("Patient has convulsions and high fever")]);
        assert!(alerts.iter().any(|a| a.term == "convulsions"));
    }

    #[test]
    fn does_not_fire_on_benign_content() {
        let lexicon = HighRiskLexicon::curated();
        let alerts = lexicon.detect(&[result("The patient reported mild cough for two days")]);
        assert!(alerts.iter().all(|a| a.severity != Severity::High));
    }

    #[test]
    fn high_severity_sorted_first() {
        let lexicon = HighRiskLexicon::curated();
        let alerts =
            lexicon.detect(&[result("Headache with convulsions requires refer immediately")]);
        assert!(alerts.len() >= 2);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn no_duplicate_alerts_across_results() {
        let lexicon = HighRiskLexicon::curated();
        let alerts = lexicon.detect(&[
            result("convulsions noted"),
            result("convulsions again"),
        ]);
        assert_eq!(alerts.iter().filter(|a| a.term == "convulsions").count(), 1);
    }

    #[test]
    fn scenario_two_terms_high_before_medium() {
        let lexicon = HighRiskLexicon::from_terms(vec![
            HighRiskTermDef {
                term: "convulsions",
                category: "Neurological",
                severity: Severity::High,
            },
            HighRiskTermDef {
                term: "severe headache",
                category: "Neurological",
                severity: Severity::Medium,
            },
        ]);
        let alerts = lexicon.detect(&[result(
            "Patient presents with convulsions and a severe headache",
        )]);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].term, "convulsions");
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[1].term, "severe headache");
        assert_eq!(alerts[1].severity, Severity::Medium);
    }
}
