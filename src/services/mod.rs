pub mod clustering;
pub mod geo;
pub mod preferences;
pub mod recommendations;
pub mod scoring;

pub use preferences::PreferenceExtractor;
pub use recommendations::RecommendationEngine;
pub use scoring::Scorer;
