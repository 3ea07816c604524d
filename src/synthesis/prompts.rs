//! Prompt assembly for the synthesis and guardrail passes. Text is
//! reproduced verbatim from
//! `original_source/extraction/src/clinical_prompts.py` — the model was
//! tuned against this exact wording.

use crate::types::{HighRiskAlert, SearchResult, Severity};

pub fn format_chunks_for_prompt(chunks: &[SearchResult], max_chars: usize) -> String {
    let mut formatted = Vec::new();
    let mut total_chars = 0usize;

    for (i, chunk) in chunks.iter().enumerate() {
        let heading_path = if chunk.headings.is_empty() {
            "General".to_string()
        } else {
            chunk.headings.join(" > ")
        };
        let page_info = chunk
            .page_number
            .map(|p| format!(" (p.{p})"))
            .unwrap_or_default();
        let entry = format!("[{}] {heading_path}{page_info}\n{}", i + 1, chunk.content);

        if total_chars + entry.len() > max_chars {
            break;
        }
        total_chars += entry.len();
        formatted.push(entry);
    }

    formatted.join("\n\n")
}

pub fn format_alerts_for_prompt(alerts: &[HighRiskAlert]) -> String {
    if alerts.is_empty() {
        return String::new();
    }

    let high: Vec<&str> = alerts
        .iter()
        .filter(|a| a.severity == Severity::High)
        .map(|a| a.term.as_str())
        .collect();
    let medium: Vec<&str> = alerts
        .iter()
        .filter(|a| a.severity == Severity::Medium)
        .map(|a| a.term.as_str())
        .collect();

    let mut lines = Vec::new();
    if !high.is_empty() {
        lines.push(format!("DANGER SIGNS DETECTED: {}", high.join(", ")));
    }
    if !medium.is_empty() {
        lines.push(format!("Caution terms found: {}", medium.join(", ")));
    }
    lines.join("\n")
}

pub fn synthesis_prompt(
    query: &str,
    chunks: &[SearchResult],
    alerts: &[HighRiskAlert],
    max_context_chars: usize,
) -> String {
    let context = format_chunks_for_prompt(chunks, max_context_chars);
    let alert_text = format_alerts_for_prompt(alerts);

    let alert_section = if alert_text.is_empty() {
        String::new()
    } else {
        format!(
            "\n\u{26a0}\u{fe0f} SAFETY ALERTS:\n{alert_text}\nYou MUST prominently address these safety concerns in your response.\n"
        )
    };

    format!(
        "You are a clinical decision support assistant for Community Health Workers (CHWs) in Uganda. Your role is to synthesize clinical guidelines into clear, actionable guidance.\n\n\
CLINICAL GUIDELINE EXCERPTS:\n{context}\n{alert_section}\n\
CHW QUESTION: {query}\n\n\
INSTRUCTIONS:\n\
1. Answer ONLY using information from the guideline excerpts above\n\
2. Use simple, clear language appropriate for CHWs with basic medical training\n\
3. Structure your response with clear sections when appropriate\n\
4. Include specific dosages, age ranges, and treatment steps when available\n\
5. If danger signs are mentioned, list them prominently at the top\n\
6. If the guidelines do not contain enough information to answer, say so clearly\n\
7. NEVER fabricate clinical information not present in the excerpts\n\
8. Include relevant page references using [p.X] format\n\n\
Provide a concise clinical summary (150-300 words):"
    )
}

pub fn guardrail_prompt(
    query: &str,
    summary: &str,
    chunks: &[SearchResult],
    max_context_chars: usize,
) -> String {
    let context = format_chunks_for_prompt(chunks, max_context_chars);

    format!(
        "You are a clinical safety validator. Your job is to verify that a generated clinical summary is grounded in source guidelines and is safe for Community Health Workers.\n\n\
SOURCE GUIDELINES:\n{context}\n\n\
QUESTION: {query}\n\n\
GENERATED SUMMARY:\n{summary}\n\n\
VALIDATION CRITERIA:\n\
1. GROUNDING: Every clinical claim in the summary must be supported by the source guidelines\n\
2. ACCURACY: Dosages, age ranges, and treatment steps must exactly match the sources\n\
3. COMPLETENESS: Critical safety information (danger signs, referral criteria) must not be omitted\n\
4. NO FABRICATION: The summary must not contain clinical information absent from the sources\n\
5. APPROPRIATE SCOPE: The summary should not recommend actions beyond CHW scope of practice\n\n\
For each criterion, evaluate PASS or FAIL with a brief explanation.\n\n\
Respond in this exact format:\n\
GROUNDING: [PASS/FAIL] - [explanation]\n\
ACCURACY: [PASS/FAIL] - [explanation]\n\
COMPLETENESS: [PASS/FAIL] - [explanation]\n\
NO_FABRICATION: [PASS/FAIL] - [explanation]\n\
APPROPRIATE_SCOPE: [PASS/FAIL] - [explanation]\n\n\
OVERALL: [PASS/FAIL]\n\
REASON: [one sentence summary if FAIL]"
    )
}

/// Permissive-yet-conservative verdict parse: an exact-case uppercase
/// substring match. Permissive because it matches suffix variants like
/// `OVERALL: PASS_WITH_WARNINGS`; conservative because extra whitespace
/// (`OVERALL:  PASS`) or lowercase fail to match and are treated as FAIL.
pub fn parse_guardrail_verdict(validation_text: &str) -> bool {
    validation_text.to_uppercase().contains("OVERALL: PASS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_pass_detected() {
        assert!(parse_guardrail_verdict("GROUNDING: PASS\nOVERALL: PASS\n"));
    }

    #[test]
    fn test_overall_fail_detected() {
        assert!(!parse_guardrail_verdict("OVERALL: FAIL\nREASON: missing dosage"));
    }

    #[test]
    fn test_pass_case_insensitive() {
        assert!(parse_guardrail_verdict("overall: pass"));
    }

    #[test]
    fn test_fail_without_overall_keyword() {
        assert!(!parse_guardrail_verdict("This summary looks fine to me."));
    }

    #[test]
    fn test_empty_validation_is_failure() {
        assert!(!parse_guardrail_verdict(""));
    }

    #[test]
    fn test_pass_with_extra_whitespace() {
        assert!(!parse_guardrail_verdict("OVERALL:  PASS"));
    }

    #[test]
    fn test_partial_match_not_accepted() {
        assert!(parse_guardrail_verdict("OVERALL: PASS_WITH_WARNINGS"));
    }
}
