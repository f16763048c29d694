//! Progress step derivation for the Analyzing phase.
//!
//! The backend reports a continuous 0-100 percentage; the display shows
//! a fixed ladder of five named steps. The step is always derived from
//! the percentage, never stored separately.

/// Discrete display step of a running analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressStep {
    Initializing,
    FeatureExtraction,
    ReviewGathering,
    AiAnalysis,
    Finalizing,
}

/// Progress ranges per step. Half-open except the last, which includes
/// 100. Together they partition 0-100 with no gaps or overlaps.
const STEP_RANGES: [(ProgressStep, i64, i64); 5] = [
    (ProgressStep::Initializing, 0, 20),
    (ProgressStep::FeatureExtraction, 20, 40),
    (ProgressStep::ReviewGathering, 40, 70),
    (ProgressStep::AiAnalysis, 70, 95),
    (ProgressStep::Finalizing, 95, 101),
];

impl ProgressStep {
    /// Map a progress percentage to its display step. Values outside
    /// 0-100 clamp to the nearest step.
    pub fn from_progress(progress: i64) -> Self {
        let clamped = progress.clamp(0, 100);
        STEP_RANGES
            .iter()
            .find(|(_, lo, hi)| clamped >= *lo && clamped < *hi)
            .map(|(step, _, _)| *step)
            .unwrap_or(ProgressStep::Initializing)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::FeatureExtraction => "Feature Extraction",
            Self::ReviewGathering => "Review Gathering",
            Self::AiAnalysis => "AI Analysis",
            Self::Finalizing => "Finalizing",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Initializing => "Setting up analysis environment",
            Self::FeatureExtraction => "Identifying key product features",
            Self::ReviewGathering => "Gathering customer reviews",
            Self::AiAnalysis => "Processing sentiment and insights",
            Self::Finalizing => "Preparing comprehensive report",
        }
    }

    /// 1-based position in the step ladder.
    pub fn index(&self) -> usize {
        match self {
            Self::Initializing => 1,
            Self::FeatureExtraction => 2,
            Self::ReviewGathering => 3,
            Self::AiAnalysis => 4,
            Self::Finalizing => 5,
        }
    }

    pub fn all() -> [ProgressStep; 5] {
        [
            Self::Initializing,
            Self::FeatureExtraction,
            Self::ReviewGathering,
            Self::AiAnalysis,
            Self::Finalizing,
        ]
    }
}

/// Glyph hint for the backend's free-text phase label, matched on
/// keyword substrings the backend is known to emit.
pub fn phase_icon(phase_label: &str) -> &'static str {
    let lower = phase_label.to_lowercase();
    if lower.contains("feature") {
        "🔍"
    } else if lower.contains("review") || lower.contains("scrap") {
        "📄"
    } else if lower.contains("analyz") {
        "📊"
    } else {
        "✨"
    }
}

/// Format elapsed seconds as `m:ss`.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
