//! Inbound event queue and its worker

mod dispatcher;

pub use dispatcher::{channel, DispatchError, Dispatcher, DispatcherHandle, DEFAULT_CAPACITY};
