pub mod event;

pub use event::{EventKind, HostEvent};
