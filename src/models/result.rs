//! Wire models for analysis results and status snapshots.
//!
//! These mirror the backend's JSON shapes. The backend is free-form in
//! places (sentiment labels are arbitrary strings, key points arrive as
//! either bare strings or objects with a mention count), so parsing here
//! is tolerant: unknown sentiment falls back to `Unknown` and extra
//! fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentiment classification for one product feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Mixed,
    Neutral,
    Unknown,
}

impl Sentiment {
    /// Parse a free-text sentiment label, case-insensitively.
    /// Anything unrecognized (including empty) maps to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            "mixed" => Self::Mixed,
            "neutral" => Self::Neutral,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Mixed => "Mixed",
            Self::Neutral => "Neutral",
            Self::Unknown => "Unknown",
        }
    }

    /// Fixed ordinal display score. This scale is a presentation
    /// heuristic, not a backend value, and must stay stable.
    pub fn score(&self) -> u32 {
        match self {
            Self::Positive => 100,
            Self::Mixed => 60,
            Self::Neutral => 50,
            Self::Negative => 20,
            Self::Unknown => 0,
        }
    }

    /// Hex color associated with this sentiment in charts.
    pub fn color_key(&self) -> &'static str {
        match self {
            Self::Positive => "#22c55e",
            Self::Negative => "#ef4444",
            Self::Mixed => "#f59e0b",
            Self::Neutral => "#6b7280",
            Self::Unknown => "#9ca3af",
        }
    }
}

/// One supporting point for a feature verdict, with an optional count of
/// reviews that mentioned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPoint {
    /// Bare string form: `"battery drains fast"`.
    Text(String),
    /// Object form: `{"point": "battery drains fast", "count": 12}`.
    Counted {
        point: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u64>,
    },
}

impl KeyPoint {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Counted { point, .. } => point,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Text(_) => None,
            Self::Counted { count, .. } => *count,
        }
    }
}

/// Backend verdict for a single product feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVerdict {
    /// Feature name as extracted (e.g. "Battery Life").
    pub feature: String,
    /// Raw sentiment label as the backend produced it.
    #[serde(default)]
    pub sentiment: String,
    /// Natural-language summary for this feature.
    #[serde(default)]
    pub verdict: String,
    /// Supporting points, in backend order.
    #[serde(default)]
    pub key_points: Vec<KeyPoint>,
}

impl FeatureVerdict {
    /// Parsed sentiment for this verdict.
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::parse(&self.sentiment)
    }
}

/// Complete analysis report from the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Per-feature verdicts, in backend order (defines display order).
    #[serde(default)]
    pub analysis: Vec<FeatureVerdict>,
    /// Total number of reviews that fed the analysis.
    #[serde(default)]
    pub total_reviews: u64,
    /// Features the analysis covered, as echoed by the backend.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// One poll of `GET /status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Whether the backend workflow is still running.
    #[serde(default)]
    pub is_running: bool,
    /// Progress percentage, 0-100.
    #[serde(default)]
    pub progress: i64,
    /// Free-text description of the current backend phase.
    #[serde(default)]
    pub current_phase: String,
    /// Error message, present only on failure.
    #[serde(default)]
    pub error: Option<String>,
    /// Final report, present only once the workflow finished.
    #[serde(default)]
    pub result: Option<AnalysisResult>,
    /// When the backend started the workflow.
    #[serde(default, deserialize_with = "deserialize_start_time")]
    pub start_time: Option<DateTime<Utc>>,
}

/// The backend renders `start_time` through Flask's `jsonify`, which
/// emits HTTP dates ("Wed, 01 Jun 2024 12:00:00 GMT"), not RFC 3339.
/// Accept both formats; an unparseable or missing value reads as `None`
/// rather than failing the whole snapshot.
fn deserialize_start_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_start_time))
}

fn parse_start_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl StatusSnapshot {
    /// A snapshot is a successful terminal state when the result is in,
    /// the workflow stopped, and no error was reported.
    pub fn is_complete(&self) -> bool {
        self.result.is_some() && !self.is_running && self.error.is_none()
    }
}
