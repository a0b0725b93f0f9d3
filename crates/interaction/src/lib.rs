//! Interactive highlighting and network-trace engine.
//!
//! Pointer events flow through [`router::PointerRouter`] into the
//! [`highlight::HighlightStore`]; clicks fan out into detail and trace
//! fetches that are reconciled by click generation in [`engine::Explorer`].

pub mod cursor;
pub mod engine;
pub mod fetch;
pub mod headless;
pub mod popup;
pub mod router;
pub mod session;
pub mod subscription;

pub use cursor::*;
pub use engine::*;
pub use fetch::*;
pub use headless::*;
pub use popup::*;
pub use router::*;
pub use session::*;
pub use subscription::*;
