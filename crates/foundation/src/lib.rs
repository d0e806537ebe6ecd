pub mod ids;
pub mod projection;
pub mod time;
pub mod viewport;

// Foundation crate: small, well-tested primitives only.
pub use ids::*;
pub use projection::*;
pub use time::*;
pub use viewport::*;
