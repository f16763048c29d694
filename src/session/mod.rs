//! Analysis flow orchestration.

mod controller;

pub use controller::{AnalysisController, FlowError, TeardownHandle};
