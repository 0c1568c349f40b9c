//! System Call Argument Validation
//!
//! Checks pointer and buffer arguments against the user/kernel split
//! before any handler runs.
//!
//! # Security Principles
//! - Validate ALL pointer arguments before use
//! - Fail-secure: a bad pointer is a [`Fault`], which kills the session
//! - Only the range is checked here; the bytes themselves are probed
//!   lazily through `UserMemory` as the handler consumes them

use core::iter::StepBy;
use core::ops::Range;

use crate::mm::{Fault, UserAddr, USER_TOP};

/// A user buffer whose whole range lies below the user/kernel split.
///
/// This type guarantees that:
/// - `addr + len` does not overflow
/// - `addr + len <= USER_TOP`
/// - `addr` is non-null unless `len == 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserBuffer {
    addr: usize,
    len: usize,
}

impl UserBuffer {
    /// Start address.
    #[inline]
    pub const fn addr(&self) -> usize {
        self.addr
    }

    /// Length in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check for a zero-length buffer.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Split into consecutive `(addr, len)` pieces of at most `limit` bytes.
    pub fn chunks(&self, limit: usize) -> Chunks {
        let limit = limit.max(1);
        Chunks {
            base: self.addr,
            end: self.len,
            limit,
            offsets: (0..self.len).step_by(limit),
        }
    }
}

/// Iterator returned by [`UserBuffer::chunks`].
pub struct Chunks {
    base: usize,
    end: usize,
    limit: usize,
    offsets: StepBy<Range<usize>>,
}

impl Iterator for Chunks {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offsets.next()?;
        Some((self.base + offset, self.limit.min(self.end - offset)))
    }
}

/// Validate a pointer argument that must name user memory.
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Pointer is below the user/kernel split
pub fn validate_user_ptr(ptr: u32) -> Result<UserAddr, Fault> {
    if ptr == 0 {
        return Err(Fault::Null);
    }
    UserAddr::new(ptr as usize).ok_or(Fault::KernelAddress(ptr as usize))
}

/// Validate a user buffer of `len` bytes at `ptr`.
///
/// # Security Checks
/// 1. Zero-length buffers are always valid
/// 2. Pointer is not null
/// 3. Pointer + length doesn't overflow
/// 4. End address is within user space
pub fn validate_user_range(ptr: u32, len: u32) -> Result<UserBuffer, Fault> {
    let (addr, len) = (ptr as usize, len as usize);

    if len == 0 {
        return Ok(UserBuffer { addr, len: 0 });
    }

    if addr == 0 {
        return Err(Fault::Null);
    }

    let end = addr.checked_add(len).ok_or(Fault::Overflow)?;
    if end > USER_TOP {
        return Err(Fault::KernelAddress(addr.max(USER_TOP)));
    }

    Ok(UserBuffer { addr, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_length() {
        assert!(validate_user_range(0, 0).is_ok());
        assert!(validate_user_range(0xFFFF_FFFF, 0).is_ok());
    }

    #[test]
    fn test_null_pointer() {
        assert_eq!(validate_user_range(0, 100), Err(Fault::Null));
        assert_eq!(validate_user_ptr(0), Err(Fault::Null));
    }

    #[test]
    fn test_crosses_split() {
        let top = USER_TOP as u32;
        assert!(validate_user_range(top - 16, 16).is_ok());
        assert_eq!(
            validate_user_range(top - 16, 17),
            Err(Fault::KernelAddress(USER_TOP))
        );
        assert_eq!(
            validate_user_range(top + 8, 1),
            Err(Fault::KernelAddress(USER_TOP + 8))
        );
        assert_eq!(validate_user_ptr(top), Err(Fault::KernelAddress(USER_TOP)));
    }

    #[test]
    fn test_chunks() {
        let buf = validate_user_range(0x1000, 700).unwrap();
        let pieces: Vec<_> = buf.chunks(300).collect();
        assert_eq!(pieces, vec![(0x1000, 300), (0x1000 + 300, 300), (0x1000 + 600, 100)]);

        let small = validate_user_range(0x1000, 11).unwrap();
        assert_eq!(small.chunks(300).collect::<Vec<_>>(), vec![(0x1000, 11)]);

        let empty = validate_user_range(0x1000, 0).unwrap();
        assert_eq!(empty.chunks(300).count(), 0);
    }
}
