pub mod client;
pub mod http;
pub mod protocol;
pub mod request;

pub use client::*;
pub use http::*;
pub use protocol::*;
pub use request::*;
