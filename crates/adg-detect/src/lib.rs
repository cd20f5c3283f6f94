pub mod archetype;
pub mod detector;

pub use archetype::Archetype;
pub use detector::{DiagramDetector, DiagramRecommendation};
