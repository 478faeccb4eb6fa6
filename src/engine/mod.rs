//! Scoring and flow matching.
//!
//! Both engines borrow an immutable catalog and are pure functions of the
//! catalog and the principal's operation set.

pub mod matcher;
pub mod scoring;

pub use matcher::{FlowMatch, FlowMatcher, FlowSeverityPolicy, FlowStatus};
pub use scoring::{ScoredOperation, ScoringEngine, ScoringResult};
