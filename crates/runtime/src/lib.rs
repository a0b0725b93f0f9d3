pub mod event_bus;
pub mod frame;
pub mod generation;
pub mod metrics;

pub use event_bus::*;
pub use frame::*;
pub use generation::*;
pub use metrics::*;
