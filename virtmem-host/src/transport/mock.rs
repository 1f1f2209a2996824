//! Mock transport for testing

use super::{Connector, Transport};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Mock transport for unit testing
///
/// Clones share the same buffers, so a test keeps one handle while the
/// supervisor owns another.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    read_buffer: VecDeque<u8>,
    write_buffer: Vec<u8>,
    connected: bool,
    /// Maximum bytes handed out per `read` call (simulates partial reads)
    chunk_limit: usize,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                read_buffer: VecDeque::new(),
                write_buffer: Vec::new(),
                connected: true,
                chunk_limit: usize::MAX,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.lock().read_buffer.extend(data);
    }

    /// Get all written data
    pub fn get_written(&self) -> Vec<u8> {
        self.lock().write_buffer.clone()
    }

    /// Take all written data, leaving the write buffer empty
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().write_buffer)
    }

    /// Bytes injected but not yet read
    pub fn pending_read(&self) -> usize {
        self.lock().read_buffer.len()
    }

    /// Limit how many bytes a single `read` returns
    pub fn set_chunk_limit(&self, limit: usize) {
        self.lock().chunk_limit = limit.max(1);
    }

    /// Simulate the device dropping off the bus; every later call faults
    pub fn disconnect(&self) {
        self.lock().connected = false;
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::transport("mock device disconnected"));
        }
        let count = inner
            .read_buffer
            .len()
            .min(buffer.len())
            .min(inner.chunk_limit);

        for (slot, byte) in buffer.iter_mut().zip(inner.read_buffer.drain(..count)) {
            *slot = byte;
        }

        Ok(count)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(Error::transport("mock device disconnected"));
        }
        inner.write_buffer.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.lock().connected {
            return Err(Error::transport("mock device disconnected"));
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock connector handing out queued [`MockTransport`]s
#[derive(Clone, Default)]
pub struct MockConnector {
    inner: Arc<Mutex<MockConnectorInner>>,
}

#[derive(Default)]
struct MockConnectorInner {
    transports: VecDeque<MockTransport>,
    failures_remaining: usize,
    attempts: usize,
    opened: usize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockConnectorInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a transport for the next successful open
    pub fn push_transport(&self, transport: MockTransport) {
        self.lock().transports.push_back(transport);
    }

    /// Make the next `count` open attempts fail
    pub fn fail_next(&self, count: usize) {
        self.lock().failures_remaining = count;
    }

    /// Total open attempts so far
    pub fn attempts(&self) -> usize {
        self.lock().attempts
    }

    /// Successful opens so far
    pub fn opened(&self) -> usize {
        self.lock().opened
    }
}

impl Connector for MockConnector {
    fn open(&mut self) -> Result<Box<dyn Transport>> {
        let mut inner = self.lock();
        inner.attempts += 1;

        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            return Err(Error::transport("mock port busy"));
        }

        match inner.transports.pop_front() {
            Some(transport) => {
                inner.opened += 1;
                Ok(Box::new(transport))
            }
            None => Err(Error::transport("no mock device attached")),
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunked_reads() {
        let mut transport = MockTransport::new();
        transport.inject_read(&[1, 2, 3, 4, 5]);
        transport.set_chunk_limit(2);

        let mut buf = [0u8; 8];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[3, 4]);
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_disconnect_faults_every_operation() {
        let mut transport = MockTransport::new();
        transport.inject_read(&[9]);
        transport.disconnect();

        let mut buf = [0u8; 1];
        assert!(transport.read(&mut buf).unwrap_err().is_transport_fault());
        assert!(transport.write_all(&[1]).unwrap_err().is_transport_fault());
        assert!(transport.flush().unwrap_err().is_transport_fault());
    }

    #[test]
    fn test_connector_failures_then_success() {
        let mut connector = MockConnector::new();
        connector.push_transport(MockTransport::new());
        connector.fail_next(2);

        assert!(connector.open().is_err());
        assert!(connector.open().is_err());
        assert!(connector.open().is_ok());
        assert!(connector.open().is_err());
        assert_eq!(connector.attempts(), 4);
        assert_eq!(connector.opened(), 1);
    }
}
