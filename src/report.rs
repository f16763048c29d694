//! Presentation-side derivations from a raw analysis report.
//!
//! The backend report is a flat list of per-feature verdicts; the report
//! view needs a sentiment distribution for the pie chart and a ranked
//! score list for the bar chart. Both are pure derivations and carry no
//! state of their own.

use crate::models::{AnalysisResult, Sentiment};

/// One slice of the sentiment distribution chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentimentSlice {
    pub sentiment: Sentiment,
    /// Number of features with this sentiment.
    pub count: usize,
    /// Hex color for the chart.
    pub color_key: &'static str,
}

/// One bar of the feature score chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureScore {
    pub feature: String,
    /// Fixed ordinal score derived from the sentiment.
    pub score: u32,
    pub sentiment: Sentiment,
}

/// Group verdicts by sentiment, preserving first-seen group order.
/// Unrecognized or missing sentiment labels land in the `Unknown` group.
pub fn sentiment_distribution(result: &AnalysisResult) -> Vec<SentimentSlice> {
    let mut slices: Vec<SentimentSlice> = Vec::new();
    for verdict in &result.analysis {
        let sentiment = verdict.sentiment();
        match slices.iter_mut().find(|s| s.sentiment == sentiment) {
            Some(slice) => slice.count += 1,
            None => slices.push(SentimentSlice {
                sentiment,
                count: 1,
                color_key: sentiment.color_key(),
            }),
        }
    }
    slices
}

/// Rank features by their sentiment score, highest first. The sort is
/// stable, so features with equal scores keep their report order.
pub fn feature_scores(result: &AnalysisResult) -> Vec<FeatureScore> {
    let mut scores: Vec<FeatureScore> = result
        .analysis
        .iter()
        .map(|verdict| FeatureScore {
            feature: verdict.feature.clone(),
            score: verdict.sentiment().score(),
            sentiment: verdict.sentiment(),
        })
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score));
    scores
}
