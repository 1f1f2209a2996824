//! Wire integer encoding and blocking reads
//!
//! # Integer Format
//!
//! ```text
//! ┌──────┬──────┬──────┬──────┐
//! │ b0   │ b1   │ b2   │ b3   │   signed 32-bit, little-endian
//! └──────┴──────┴──────┴──────┘
//! ```
//!
//! Byte order is fixed to little-endian on both sides rather than following
//! the host's native order, so a big-endian host still talks to the
//! (little-endian) microcontrollers correctly.
//!
//! # Blocking Reads
//!
//! Transports return whatever is immediately available. Command payloads must
//! be read in full, so [`read_exact`] keeps polling until every byte arrived or
//! the transport faults. There is no timeout: a stalled device stalls only the
//! command being serviced.
//!
//! Sizes announced by the device are untrusted. Filler replies and discarded
//! payloads go through a fixed [`CHUNK_SIZE`] buffer, never one sized by the
//! request.

use crate::error::Result;
use crate::transport::Transport;
use std::time::Duration;

/// Size of a wire integer in bytes
pub const INT_SIZE: usize = 4;

/// Largest buffer used for zero filler and discarded payloads
pub const CHUNK_SIZE: usize = 256;

/// Pause between empty polls while waiting for payload bytes
const BLOCKING_READ_IDLE: Duration = Duration::from_micros(200);

#[inline]
pub fn encode_i32(value: i32) -> [u8; INT_SIZE] {
    value.to_le_bytes()
}

#[inline]
pub fn decode_i32(bytes: [u8; INT_SIZE]) -> i32 {
    i32::from_le_bytes(bytes)
}

/// Fill `buffer` completely, retrying partial reads
pub fn read_exact(transport: &mut dyn Transport, buffer: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buffer.len() {
        match transport.read(&mut buffer[filled..])? {
            0 => std::thread::sleep(BLOCKING_READ_IDLE),
            n => filled += n,
        }
    }
    Ok(())
}

/// Consume and drop `count` bytes
pub fn discard(transport: &mut dyn Transport, count: usize) -> Result<()> {
    let mut scratch = [0u8; CHUNK_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE);
        read_exact(transport, &mut scratch[..n])?;
        remaining -= n;
    }
    Ok(())
}

/// Send `count` zero bytes
pub fn write_zeros(transport: &mut dyn Transport, count: usize) -> Result<()> {
    let zeros = [0u8; CHUNK_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE);
        transport.write_all(&zeros[..n])?;
        remaining -= n;
    }
    Ok(())
}

/// Read one wire integer
pub fn read_i32(transport: &mut dyn Transport) -> Result<i32> {
    let mut bytes = [0u8; INT_SIZE];
    read_exact(transport, &mut bytes)?;
    Ok(decode_i32(bytes))
}

/// Write one wire integer
pub fn write_i32(transport: &mut dyn Transport, value: i32) -> Result<()> {
    transport.write_all(&encode_i32(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    #[test]
    fn test_encoding_is_little_endian() {
        assert_eq!(encode_i32(1), [1, 0, 0, 0]);
        assert_eq!(encode_i32(0x0403_0201), [1, 2, 3, 4]);
        assert_eq!(encode_i32(-1), [0xFF; 4]);
        assert_eq!(decode_i32([0x00, 0x01, 0x00, 0x00]), 256);
        assert_eq!(decode_i32([0xFE, 0xFF, 0xFF, 0xFF]), -2);
    }

    #[test]
    fn test_read_i32_across_partial_reads() {
        let mut transport = MockTransport::new();
        transport.set_chunk_limit(1);
        transport.inject_read(&encode_i32(123_456));

        assert_eq!(read_i32(&mut transport).unwrap(), 123_456);
        assert_eq!(transport.pending_read(), 0);
    }

    #[test]
    fn test_discard_leaves_trailing_data() {
        let mut transport = MockTransport::new();
        transport.set_chunk_limit(3);
        let mut data = vec![0xAB; CHUNK_SIZE * 2 + 5];
        data.extend_from_slice(&[1, 2]);
        transport.inject_read(&data);

        discard(&mut transport, CHUNK_SIZE * 2 + 5).unwrap();
        assert_eq!(transport.pending_read(), 2);

        let mut rest = [0u8; 2];
        read_exact(&mut transport, &mut rest).unwrap();
        assert_eq!(rest, [1, 2]);
    }

    #[test]
    fn test_write_zeros() {
        let mut transport = MockTransport::new();
        write_zeros(&mut transport, CHUNK_SIZE + 3).unwrap();
        assert_eq!(transport.get_written(), vec![0u8; CHUNK_SIZE + 3]);

        write_zeros(&mut transport, 0).unwrap();
        assert_eq!(transport.get_written().len(), CHUNK_SIZE + 3);
    }

    #[test]
    fn test_read_fails_on_disconnect() {
        let mut transport = MockTransport::new();
        transport.inject_read(&[1, 2]);
        transport.disconnect();

        let err = read_i32(&mut transport).unwrap_err();
        assert!(err.is_transport_fault());
    }

    #[test]
    fn test_write_i32() {
        let mut transport = MockTransport::new();
        write_i32(&mut transport, 7).unwrap();
        assert_eq!(transport.get_written(), vec![7, 0, 0, 0]);
    }
}
