pub mod factory;
pub mod layer;

pub use factory::*;
pub use layer::*;
