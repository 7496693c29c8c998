//! khoj-chat: streaming chat client for the Khoj backend
//!
//! The server answers a chat query with a chunked body of frames separated
//! by a sentinel delimiter. This crate turns that body into typed events,
//! folds them into a per-turn message that renders correctly at every
//! partial state, and extracts the file-edit directives the assistant may
//! embed in its answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use khoj_chat::prelude::*;
//! use khoj_chat::render::EscapingRenderer;
//! use tokio_util::sync::CancellationToken;
//!
//! # struct Stdout;
//! # impl MessageView for Stdout {
//! #     fn mount_message(&mut self, m: &RenderedMessage) { println!("{}", m.markdown) }
//! #     fn show_error(&mut self, e: &str) { eprintln!("{e}") }
//! #     fn finalize_message(&mut self, _: &FinalizedTurn) {}
//! # }
//! # async fn example() -> khoj_chat::error::Result<()> {
//! let client = KhojClient::new(KhojConfig::from_env()?)?;
//! let conversation_id = client.create_session(None).await?;
//!
//! let mut driver = TurnDriver::new(client.config().url.clone(), EscapingRenderer);
//! let input = driver.prepare(&client, "/notes what is on my plate today?", &conversation_id, &[], false);
//! let outcome = driver.send(&client, input, &mut Stdout, &CancellationToken::new()).await;
//! assert!(outcome.is_completed());
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod chat;
pub mod client;
pub mod config;
pub mod edit;
pub mod error;
pub mod prelude;
pub mod protocol;
pub mod render;
pub mod session;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
