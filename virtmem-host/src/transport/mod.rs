//! Transport layer for the device link
//!
//! The link is an opaque byte stream. [`Connector`] knows how to (re)open it
//! with fixed parameters, [`Transport`] is one open handle. All failures are
//! reported as [`Error::TransportFault`](crate::error::Error::TransportFault).

use crate::error::Result;

mod mock;
mod serial;

pub use mock::{MockConnector, MockTransport};
pub use serial::{SerialConnector, SerialTransport};

/// Transport trait for device communication
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    ///
    /// Returns `Ok(0)` when nothing is currently available. Must not block
    /// longer than the transport's short read timeout.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write all of `data`
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> Result<()>;
}

/// Opens a [`Transport`] with fixed parameters
///
/// The supervisor calls [`Connector::open`] on first connect and again after
/// every transport fault, so parameters survive reconnects.
pub trait Connector: Send {
    /// Attempt to open the link once
    fn open(&mut self) -> Result<Box<dyn Transport>>;

    /// Human readable link description for logs
    fn describe(&self) -> String;
}
