//! Data models for the Revify client.

mod result;
mod session;

pub use result::{AnalysisResult, FeatureVerdict, KeyPoint, Sentiment, StatusSnapshot};
pub use session::{AnalysisSession, SessionPhase};
