pub mod headless;
pub mod picking;
pub mod surface;

pub use headless::*;
pub use picking::*;
pub use surface::*;
