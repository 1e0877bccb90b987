//! Default pattern anchoring and query generation.

pub mod anchors;
pub mod paths;

pub use anchors::CartesianAnchors;
pub use paths::PathQueryGenerator;
