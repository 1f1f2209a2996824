//! Error types for virtmem-host

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// virtmem-host error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Link-level failure (disconnect, I/O error, malformed low-level read).
    ///
    /// Every serial port and transport I/O error is translated into this
    /// variant. The supervisor recovers from it by reconnecting.
    #[error("Transport fault: {0}")]
    TransportFault(String),

    /// I/O error outside the device link (config files, console)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Memory pool access outside `[0, len)`
    #[error("Pool access out of bounds: index {index}, size {size}, pool length {len}")]
    PoolOutOfBounds {
        /// Requested start offset
        index: i32,
        /// Requested byte count
        size: i32,
        /// Current pool length
        len: usize,
    },

    /// Configuration could not be parsed or written
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Shutdown was requested before the operation could complete
    #[error("Shutdown requested")]
    ShutdownRequested,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Translate a low-level I/O failure on the device link
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Error::TransportFault(err.to_string())
    }

    /// True for faults that should trigger a reconnect
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Error::TransportFault(_))
    }
}

impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Error::TransportFault(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
