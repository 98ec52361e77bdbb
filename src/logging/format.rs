//! JSON log lines: one JSON object per line (ndjson) for ingestion and audit.

use crate::risk::FinalAssessment;
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Audit line for one stage outcome or final decision.
#[derive(Debug, Serialize)]
pub struct LogEvent<'a> {
    pub ts: String,
    pub level: &'a str,
    pub message: &'a str,
    pub session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> LogEvent<'a> {
    pub fn new(level: &'a str, message: &'a str, session_id: &'a str) -> Self {
        Self {
            ts: chrono::Utc::now().to_rfc3339(),
            level,
            message,
            session_id,
            modality: None,
            probability: None,
            tier: None,
            error: None,
        }
    }

    /// Audit line for a session's final decision.
    pub fn final_decision(session_id: &'a str, assessment: &FinalAssessment) -> Self {
        let mut event = Self::new("info", "assessment finalized", session_id);
        event.probability = Some(assessment.final_probability);
        event.tier = Some(assessment.recommendation_tier.as_str());
        event
    }
}

pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber writing to stderr, so stdout stays free
    /// for command output. `RUST_LOG` overrides `default_level`.
    pub fn init(json: bool, default_level: &str) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        if json {
            let fmt = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(FmtSpan::NONE)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(fmt).init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    /// Write one serialized line without going through tracing.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) -> std::io::Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(w, "{}", line)
    }
}
