//! Candidate ranking, scheme building and the final decision.

pub mod candidates;
pub mod decision;
pub mod schemes;

pub use candidates::{Recommendation, Recommendations, recommendations, select_candidates};
pub use decision::{DecisionInput, DecisionRecord, FinalVideoList, build_decision, export_final};
pub use schemes::{
    SchemeResult, SchemeStatistics, SchemeSummaryRow, SchemeVideo, SchemesComparison, build_scheme,
    build_schemes, scheme_file_name,
};
