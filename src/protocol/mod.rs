//! Wire protocol: sentinel-delimited frames carrying typed JSON events or
//! raw text deltas.

pub mod classify;
pub mod frame;
pub mod stream;

pub use classify::classify;
pub use frame::{FrameDecoder, DELIMITER};
pub use stream::event_stream;
