//! Core types shared across the client.

pub mod event;
pub mod references;
pub mod request;

pub use event::*;
pub use references::*;
pub use request::*;
