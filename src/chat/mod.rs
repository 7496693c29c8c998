//! Query composition: chat modes and open-files context.

pub mod context;
pub mod mode;

pub use context::{load_open_files, open_files_context, FileAccessMode, OpenFile};
pub use mode::{compose_message, final_query, ChatMode, ComposedMessage};
