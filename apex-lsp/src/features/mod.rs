//! Language features: symbol resolution, completion, hover rendering.

pub mod completion;
pub mod hover;
pub mod resolve;
