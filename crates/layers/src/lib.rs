pub mod layer;
pub mod recording;
pub mod symbology;

pub use layer::*;
pub use recording::*;
pub use symbology::*;
