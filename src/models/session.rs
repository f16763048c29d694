//! Analysis session state.
//!
//! One `AnalysisSession` tracks a single product URL through the whole
//! flow: input, feature extraction, feature selection, analysis polling,
//! and the terminal outcome. Phases are mutually exclusive and only move
//! forward, except for an explicit reset back to `Input`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AnalysisResult;

/// Discrete phase of an analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Input,
    ExtractingFeatures,
    SelectingFeatures,
    Analyzing,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::ExtractingFeatures => "extracting_features",
            Self::SelectingFeatures => "selecting_features",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Terminal phases see no further automatic transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Mutable state for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    /// Product URL, set once at session start.
    pub product_url: String,
    /// Display name, derived from the URL when the user gives none.
    pub product_name: String,
    /// Current phase.
    pub phase: SessionPhase,
    /// Features returned by extraction, in backend order.
    pub extracted_features: Vec<String>,
    /// Features chosen for analysis. Always a subset of
    /// `extracted_features`, kept in extraction order.
    pub selected_features: Vec<String>,
    /// Progress percentage, meaningful only while `Analyzing`.
    pub progress: i64,
    /// Free-text phase label from the latest status poll.
    pub current_phase_label: String,
    /// Error message, set on entering `Failed`.
    pub error_message: Option<String>,
    /// Backend-reported analysis start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Final report, set on entering `Completed`.
    pub result: Option<AnalysisResult>,
}

impl AnalysisSession {
    /// Create a fresh session in the `Input` phase.
    pub fn new(product_url: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_url: product_url.into(),
            product_name: product_name.into(),
            phase: SessionPhase::Input,
            extracted_features: Vec::new(),
            selected_features: Vec::new(),
            progress: 0,
            current_phase_label: String::new(),
            error_message: None,
            start_time: None,
            result: None,
        }
    }

    /// Record extracted features and select all of them by default.
    pub fn set_extracted_features(&mut self, features: Vec<String>) {
        self.selected_features = features.clone();
        self.extracted_features = features;
    }

    /// Flip membership of `feature` in the selection. Features not
    /// present in `extracted_features` are ignored. Selection order
    /// always follows extraction order.
    pub fn toggle_feature(&mut self, feature: &str) {
        if !self.extracted_features.iter().any(|f| f == feature) {
            return;
        }
        if self.selected_features.iter().any(|f| f == feature) {
            self.selected_features.retain(|f| f != feature);
        } else {
            self.selected_features.push(feature.to_string());
            let order = &self.extracted_features;
            self.selected_features
                .sort_by_key(|f| order.iter().position(|e| e == f));
        }
    }

    /// Select all features, or clear the selection if all are already
    /// selected.
    pub fn toggle_all(&mut self) {
        if self.selected_features.len() == self.extracted_features.len() {
            self.selected_features.clear();
        } else {
            self.selected_features = self.extracted_features.clone();
        }
    }

    pub fn is_selected(&self, feature: &str) -> bool {
        self.selected_features.iter().any(|f| f == feature)
    }

    /// Elapsed seconds since the backend confirmed analysis start.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.start_time.map(|start| (now - start).num_seconds().max(0))
    }

    /// Clear transient analysis state ahead of a new analysis run.
    pub fn reset_analysis_state(&mut self) {
        self.progress = 0;
        self.current_phase_label.clear();
        self.error_message = None;
        self.start_time = None;
        self.result = None;
    }
}
