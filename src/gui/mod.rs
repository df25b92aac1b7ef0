//! GUI module

pub mod app;
pub mod clipboard;

// Re-export for convenience
pub use app::Message;
pub use app::Mp3LoaderApp;
