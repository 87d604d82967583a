pub mod codec;
pub mod detection;
pub mod error;
pub mod overlay;
pub mod pipeline;
