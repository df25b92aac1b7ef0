pub mod actor;
pub mod messages;

pub use actor::{spawn_backend, BackendActor, BackendHandle};
pub use messages::{BackendCommand, BackendEvent};
