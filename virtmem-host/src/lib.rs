//! virtmem-host - Serial RAM and input host for virtmem devices
//!
//! A microcontroller running the virtmem serial allocator uses this host as
//! its external memory and keyboard. Everything the board prints is passed
//! through to a display sink, except for in-band commands introduced by a
//! configurable escape byte. Those commands read and write a host-side memory
//! pool and drain a host-fed input queue.
//!
//! ## Layout
//!
//! - [`transport`]: serial and mock links behind the `Transport`/`Connector` traits
//! - [`protocol`]: escape decoder, command codes, dispatcher, wire integers
//! - [`pool`], [`input`]: memory pool and input queue
//! - [`session`]: per-link state threaded through the dispatcher
//! - [`supervisor`]: connect, poll, reconnect-on-fault, shutdown
//! - [`passthrough`]: display sink and input line producers for the binary

pub mod backoff;
pub mod config;
pub mod error;
pub mod input;
pub mod passthrough;
pub mod pool;
pub mod protocol;
pub mod session;
pub mod supervisor;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
pub use input::InputQueue;
pub use supervisor::{ConnectionState, LinkConfig, Supervisor};
