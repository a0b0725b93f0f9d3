pub mod geo;
pub mod ids;
pub mod kind;
pub mod trace;

// Foundation crate: small, well-tested primitives only.
pub use geo::*;
pub use ids::*;
pub use kind::*;
pub use trace::*;
