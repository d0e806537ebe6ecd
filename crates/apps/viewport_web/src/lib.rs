//! Map viewport state sync and interaction notifications.
//!
//! `MapView::init` wires a render surface to the notification bus, the
//! permalink/history synchronizer and the one-shot layer loader. The
//! `browser` module binds all of it to `window` on wasm32.

pub mod config;
pub mod events;
pub mod interaction;
pub mod loader;
pub mod map_view;

#[cfg(target_arch = "wasm32")]
pub mod browser;

pub use config::*;
pub use events::*;
pub use interaction::*;
pub use loader::*;
pub use map_view::*;
