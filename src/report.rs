//! Medical report domain types.
//!
//! A `MedicalReport` is the single domain entity: the structured summary of
//! one voice consultation. Every report handed to a caller has all fields
//! populated, whether it came from a successful model parse (after lenient
//! normalization), or from the deterministic fallback that needs no model
//! at all.

use serde::{Deserialize, Serialize};

/// Structured summary of one consultation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub session_id: String,
    pub agent: String,
    pub user: String,
    pub timestamp: String,
    pub chief_complaint: String,
    pub summary: String,
    pub symptoms: Vec<String>,
    pub duration: String,
    pub severity: String,
    pub medications_mentioned: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Untrusted report as parsed from raw model output. Every field defaults,
/// so any JSON object parses; normalization decides what survives.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedReport {
    pub session_id: String,
    pub agent: String,
    pub user: String,
    pub timestamp: String,
    pub chief_complaint: String,
    pub summary: String,
    pub symptoms: Vec<String>,
    pub duration: String,
    pub severity: String,
    pub medications_mentioned: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Why a fallback report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Neither LLM credential is configured; not an error condition.
    MissingCredentials,
    /// The model was reachable but generation failed past all retries.
    GenerationError,
}

/// Identifier and clock capability injected into normalization and
/// fallback construction so tests can pin exact output values.
pub trait Stamp: Send + Sync {
    /// A fresh unique session identifier.
    fn session_id(&self) -> String;
    /// Current time as an ISO-8601 / RFC 3339 string.
    fn timestamp(&self) -> String;
}

/// Production stamp: random v4 UUIDs and the wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStamp;

impl Stamp for SystemStamp {
    fn session_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn timestamp(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

impl MedicalReport {
    /// Normalize a parsed-but-untrusted report.
    ///
    /// Lenient-merge policy: fields with a safe deterministic default
    /// (`sessionId`, `agent`, `user`, `timestamp`) are filled in when the
    /// model left them absent or empty; list fields already default to
    /// empty on parse. The clinical fields (`chiefComplaint`, `summary`,
    /// `duration`, `severity`) pass through as-is even when empty - partial
    /// structure from the model beats a full fallback. Idempotent: feeding
    /// a normalized report back through changes nothing.
    pub fn from_parsed(parsed: ParsedReport, doctor: &str, user: &str, stamp: &dyn Stamp) -> Self {
        Self {
            session_id: or_default(parsed.session_id, || stamp.session_id()),
            agent: or_default(parsed.agent, || agent_label(doctor)),
            user: or_default(parsed.user, || user_label(user)),
            timestamp: or_default(parsed.timestamp, || stamp.timestamp()),
            chief_complaint: parsed.chief_complaint,
            summary: parsed.summary,
            symptoms: parsed.symptoms,
            duration: parsed.duration,
            severity: parsed.severity,
            medications_mentioned: parsed.medications_mentioned,
            recommendations: parsed.recommendations,
        }
    }

    /// Build a complete report without any model call. This path performs
    /// no I/O and no parsing, so it cannot fail.
    pub fn fallback(doctor: &str, user: &str, reason: FallbackReason, stamp: &dyn Stamp) -> Self {
        let (chief_complaint, summary, severity, recommendations) = match reason {
            FallbackReason::GenerationError => (
                "Error generating report",
                "There was an error generating the medical report. Please try again later.",
                "unknown",
                vec![
                    "Please try the call again".to_string(),
                    "Contact support if the issue persists".to_string(),
                ],
            ),
            FallbackReason::MissingCredentials => (
                "Unable to generate detailed report - missing API key.",
                "Please configure OPENROUTER_API_KEY or OPENAI_API_KEY in the environment to enable full report generation.",
                "mild",
                vec!["Configure API keys".to_string()],
            ),
        };

        Self {
            session_id: stamp.session_id(),
            agent: agent_label(doctor),
            user: user_label(user),
            timestamp: stamp.timestamp(),
            chief_complaint: chief_complaint.to_string(),
            summary: summary.to_string(),
            symptoms: Vec::new(),
            duration: String::new(),
            severity: severity.to_string(),
            medications_mentioned: Vec::new(),
            recommendations,
        }
    }
}

/// `"<doctor> AI"`, with a generic stand-in for a blank doctor label.
fn agent_label(doctor: &str) -> String {
    let doctor = doctor.trim();
    if doctor.is_empty() {
        "Doctor AI".to_string()
    } else {
        format!("{} AI", doctor)
    }
}

fn user_label(user: &str) -> String {
    let user = user.trim();
    if user.is_empty() {
        "Anonymous".to_string()
    } else {
        user.to_string()
    }
}

fn or_default(value: String, default: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value
    }
}
