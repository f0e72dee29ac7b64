// =============================================================================
// Signals Module
// =============================================================================
//
// Signal aggregation for one ticker session:
// - Registry of named, index-aligned signal series
// - Weighted composite of the registered signals

pub mod registry;
pub mod weighted_score;

pub use registry::SignalRegistry;
pub use weighted_score::{CompositeResult, WeightVector, COMPOSITE_COLUMN};
