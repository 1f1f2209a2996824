//! Device link protocol
//!
//! The link carries a transparent byte stream. One configurable escape byte
//! introduces a command:
//!
//! ```text
//! ┌────────┬──────────┬────────────────────┐
//! │ ESCAPE │ CMD 0..7 │ payload (per cmd)  │
//! └────────┴──────────┴────────────────────┘
//! ```
//!
//! Every other byte is passthrough data for the display sink.

mod command;
mod decoder;
mod dispatcher;
pub mod wire;

pub use command::Command;
pub use decoder::{DecoderState, Frame, FrameDecoder};
pub use dispatcher::dispatch;
