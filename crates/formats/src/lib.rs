pub mod layer_config;
pub mod permalink;

pub use layer_config::*;
pub use permalink::*;
