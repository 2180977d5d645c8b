//! Report prompt construction.
//!
//! Pure and deterministic: the same transcript, doctor, and user always
//! render the same instruction. The field names enumerated here must match
//! the serde names on `ParsedReport` exactly; the tests below guard
//! against drift between the two.

/// Appended to the prompt on the stricter second attempt.
pub const JSON_ONLY_SUFFIX: &str = "\n\nRespond ONLY with the JSON object.";

/// Render the report-generation instruction for one finished conversation.
///
/// The transcript turns are joined with newlines at the end of the prompt,
/// after a fixed task description, a numbered enumeration of the required
/// fields, and an explicit example of the expected JSON shape.
pub fn build_report_prompt(conversation: &[String], doctor: &str, user: &str) -> String {
    format!(
        r#"You are an AI Medical Voice Agent that just finished a voice conversation with a user. Based on the transcript, generate a structured report with the following fields:
1. sessionId: a unique session identifier
2. agent: the medical specialist name (e.g., "{doctor} AI")
3. user: name of the patient or "{user}" if not provided
4. timestamp: current date and time in ISO format
5. chiefComplaint: one-sentence summary of the main health concern
6. summary: a 2-3 sentence summary of the conversation, symptoms, and recommendations
7. symptoms: list of symptoms mentioned by the user
8. duration: how long the user has experienced the symptoms
9. severity: mild, moderate, or severe
10. medicationsMentioned: list of any medicines mentioned
11. recommendations: list of AI suggestions (e.g., rest, see a doctor)

Return the result in this JSON format:
{{
  "sessionId": "string",
  "agent": "string",
  "user": "string",
  "timestamp": "ISO Date string",
  "chiefComplaint": "string",
  "summary": "string",
  "symptoms": ["symptom1", "symptom2"],
  "duration": "string",
  "severity": "string",
  "medicationsMentioned": ["med1", "med2"],
  "recommendations": ["rec1", "rec2"]
}}

Only include valid fields. Respond with valid JSON only.

Transcript:
{transcript}"#,
        doctor = doctor,
        user = user,
        transcript = conversation.join("\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_conversation() -> Vec<String> {
        vec![
            "assistant: Hello, what brings you in today?".to_string(),
            "user: I've had a sore throat for three days.".to_string(),
        ]
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let conversation = sample_conversation();
        let a = build_report_prompt(&conversation, "General Physician", "Anonymous");
        let b = build_report_prompt(&conversation, "General Physician", "Anonymous");
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_transcript_joined_by_newlines() {
        let prompt = build_report_prompt(&sample_conversation(), "General Physician", "Anonymous");
        assert!(prompt.contains(
            "assistant: Hello, what brings you in today?\nuser: I've had a sore throat for three days."
        ));
    }

    #[test]
    fn test_prompt_handles_empty_transcript() {
        let prompt = build_report_prompt(&[], "General Physician", "Anonymous");
        assert!(prompt.ends_with("Transcript:\n"));
    }

    #[test]
    fn test_prompt_enumerates_parser_field_names() {
        // Drift between the prompt and ParsedReport's serde names is a
        // silent failure class; keep the two in lockstep.
        let prompt = build_report_prompt(&[], "General Physician", "Anonymous");
        for field in [
            "sessionId",
            "agent",
            "user",
            "timestamp",
            "chiefComplaint",
            "summary",
            "symptoms",
            "duration",
            "severity",
            "medicationsMentioned",
            "recommendations",
        ] {
            assert!(prompt.contains(field), "prompt missing field {}", field);
        }
    }

    #[test]
    fn test_prompt_embeds_labels() {
        let prompt = build_report_prompt(&[], "Pediatrician", "Alex");
        assert!(prompt.contains("Pediatrician AI"));
        assert!(prompt.contains("\"Alex\""));
    }
}
