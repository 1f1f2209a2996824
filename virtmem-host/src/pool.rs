//! Host-resident memory pool addressed by the device
//!
//! The pool is a plain zero-initialised byte buffer. Addresses are
//! `(index, size)` pairs as they arrive on the wire (signed 32-bit), and every
//! access is checked against `[0, len)`. Rejected accesses are reported as
//! [`Error::PoolOutOfBounds`]; the dispatcher decides how to keep the link in
//! step afterwards.

use crate::error::{Error, Result};

/// Contiguous byte buffer owned by the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPool {
    data: Vec<u8>,
}

impl MemoryPool {
    /// Allocate a fresh zero-filled pool of `size` bytes
    pub fn allocate(size: i32) -> Result<Self> {
        let len = usize::try_from(size)
            .map_err(|_| Error::InvalidParameter(format!("negative pool size {}", size)))?;
        Ok(Self { data: vec![0; len] })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow `[index, index + size)`
    pub fn read_slice(&self, index: i32, size: i32) -> Result<&[u8]> {
        let range = self.checked_range(index, size)?;
        Ok(&self.data[range])
    }

    /// Mutably borrow `[index, index + size)` so a payload can land in place
    pub fn slice_mut(&mut self, index: i32, size: i32) -> Result<&mut [u8]> {
        let range = self.checked_range(index, size)?;
        Ok(&mut self.data[range])
    }

    fn checked_range(&self, index: i32, size: i32) -> Result<std::ops::Range<usize>> {
        let out_of_bounds = || Error::PoolOutOfBounds {
            index,
            size,
            len: self.data.len(),
        };

        let start = usize::try_from(index).map_err(|_| out_of_bounds())?;
        let count = usize::try_from(size).map_err(|_| out_of_bounds())?;
        let end = start.checked_add(count).ok_or_else(out_of_bounds)?;
        if end > self.data.len() {
            return Err(out_of_bounds());
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_is_zero_filled() {
        let pool = MemoryPool::allocate(16).unwrap();
        assert_eq!(pool.len(), 16);
        assert_eq!(pool.read_slice(0, 16).unwrap(), &[0u8; 16]);
    }

    #[test]
    fn test_allocate_rejects_negative_size() {
        assert!(matches!(
            MemoryPool::allocate(-1),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_fill_then_read() {
        let mut pool = MemoryPool::allocate(8).unwrap();
        pool.slice_mut(3, 3).unwrap().copy_from_slice(&[0xAA, 0xBB, 0xCC]);

        assert_eq!(pool.read_slice(3, 3).unwrap(), &[0xAA, 0xBB, 0xCC]);
        assert_eq!(pool.read_slice(0, 8).unwrap(), &[0, 0, 0, 0xAA, 0xBB, 0xCC, 0, 0]);
    }

    #[test]
    fn test_range_ending_at_len_is_valid() {
        let mut pool = MemoryPool::allocate(4).unwrap();
        pool.slice_mut(2, 2).unwrap().copy_from_slice(&[7, 8]);
        assert_eq!(pool.read_slice(2, 2).unwrap(), &[7, 8]);
        assert!(pool.read_slice(4, 0).unwrap().is_empty());
    }

    #[test]
    fn test_out_of_range_access_is_rejected() {
        let mut pool = MemoryPool::allocate(4).unwrap();

        assert!(matches!(
            pool.read_slice(2, 3),
            Err(Error::PoolOutOfBounds { index: 2, size: 3, len: 4 })
        ));
        assert!(pool.read_slice(-1, 1).is_err());
        assert!(pool.read_slice(0, -1).is_err());
        assert!(pool.read_slice(i32::MAX, i32::MAX).is_err());
        assert!(pool.slice_mut(3, 2).is_err());
        assert!(pool.slice_mut(0, i32::MIN).is_err());

        // Rejected write leaves the pool untouched
        assert_eq!(pool.read_slice(0, 4).unwrap(), &[0, 0, 0, 0]);
    }
}
