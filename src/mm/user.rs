//! Fault-Safe User Memory Access
//!
//! Every access to memory supplied by a user program goes through the
//! [`UserMemory`] trait. Implementations only provide the raw probes; the
//! trait's provided methods reject kernel addresses before a probe is
//! ever issued.
//!
//! # Word Order
//! [`UserMemory::read_u32`] is little-endian: the byte at the lowest
//! address is the least significant one.

use alloc::vec::Vec;
use core::fmt;

use super::address::UserAddr;

/// A failed access to user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Null pointer passed where memory is required.
    Null,
    /// Address at or above the user/kernel split.
    KernelAddress(usize),
    /// Address range wraps around the address space.
    Overflow,
    /// No user-accessible page at this address.
    NotMapped(usize),
    /// Page is mapped but not writable.
    ReadOnly(usize),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null user pointer"),
            Self::KernelAddress(addr) => write!(f, "kernel address {:#x}", addr),
            Self::Overflow => write!(f, "user range overflows"),
            Self::NotMapped(addr) => write!(f, "unmapped user address {:#x}", addr),
            Self::ReadOnly(addr) => write!(f, "read-only user address {:#x}", addr),
        }
    }
}

/// Byte-granular access to the current session's address space.
pub trait UserMemory {
    /// Read one byte from a mapped, user-readable page.
    ///
    /// Only called for addresses below the user/kernel split.
    fn probe_read(&self, addr: UserAddr) -> Result<u8, Fault>;

    /// Write one byte to a mapped, user-writable page.
    ///
    /// Only called for addresses below the user/kernel split.
    fn probe_write(&self, addr: UserAddr, byte: u8) -> Result<(), Fault>;

    /// Read a byte at an untrusted address.
    fn read_byte(&self, addr: usize) -> Result<u8, Fault> {
        let addr = UserAddr::new(addr).ok_or(Fault::KernelAddress(addr))?;
        self.probe_read(addr)
    }

    /// Write a byte at an untrusted address.
    fn write_byte(&self, addr: usize, byte: u8) -> Result<(), Fault> {
        let addr = UserAddr::new(addr).ok_or(Fault::KernelAddress(addr))?;
        self.probe_write(addr, byte)
    }

    /// Read a little-endian 32-bit word as four byte reads in address order.
    fn read_u32(&self, addr: usize) -> Result<u32, Fault> {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let at = addr.checked_add(i).ok_or(Fault::Overflow)?;
            *byte = self.read_byte(at)?;
        }
        Ok(u32::from_le_bytes(bytes))
    }

    /// Fill `dst` from consecutive user bytes starting at `addr`.
    fn copy_in(&self, addr: usize, dst: &mut [u8]) -> Result<(), Fault> {
        for (i, byte) in dst.iter_mut().enumerate() {
            let at = addr.checked_add(i).ok_or(Fault::Overflow)?;
            *byte = self.read_byte(at)?;
        }
        Ok(())
    }

    /// Store `src` into consecutive user bytes starting at `addr`.
    fn copy_out(&self, addr: usize, src: &[u8]) -> Result<(), Fault> {
        for (i, &byte) in src.iter().enumerate() {
            let at = addr.checked_add(i).ok_or(Fault::Overflow)?;
            self.write_byte(at, byte)?;
        }
        Ok(())
    }

    /// Read a NUL-terminated string of at most `limit` bytes (NUL included).
    ///
    /// Returns the bytes before the NUL, or `Ok(None)` if no NUL shows up
    /// within `limit` bytes.
    fn read_cstr(&self, addr: usize, limit: usize) -> Result<Option<Vec<u8>>, Fault> {
        let mut bytes = Vec::new();
        for i in 0..limit {
            let at = addr.checked_add(i).ok_or(Fault::Overflow)?;
            match self.read_byte(at)? {
                0 => return Ok(Some(bytes)),
                byte => bytes.push(byte),
            }
        }
        Ok(None)
    }
}

impl<M: UserMemory + ?Sized> UserMemory for &M {
    fn probe_read(&self, addr: UserAddr) -> Result<u8, Fault> {
        (**self).probe_read(addr)
    }

    fn probe_write(&self, addr: UserAddr, byte: u8) -> Result<(), Fault> {
        (**self).probe_write(addr, byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::USER_TOP;
    use core::cell::Cell;

    /// Flat memory covering `[base, base + data.len())` that counts probes.
    struct Flat {
        base: usize,
        data: Vec<u8>,
        probes: Cell<usize>,
    }

    impl Flat {
        fn new(base: usize, data: &[u8]) -> Self {
            Self {
                base,
                data: data.to_vec(),
                probes: Cell::new(0),
            }
        }
    }

    impl UserMemory for Flat {
        fn probe_read(&self, addr: UserAddr) -> Result<u8, Fault> {
            self.probes.set(self.probes.get() + 1);
            addr.as_usize()
                .checked_sub(self.base)
                .and_then(|off| self.data.get(off).copied())
                .ok_or(Fault::NotMapped(addr.as_usize()))
        }

        fn probe_write(&self, addr: UserAddr, _byte: u8) -> Result<(), Fault> {
            self.probes.set(self.probes.get() + 1);
            Err(Fault::ReadOnly(addr.as_usize()))
        }
    }

    #[test]
    fn test_read_u32_little_endian() {
        let mem = Flat::new(0x1000, &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(mem.read_u32(0x1000), Ok(0x1234_5678));
    }

    #[test]
    fn test_read_u32_partial_mapping() {
        let mem = Flat::new(0x1000, &[1, 2, 3]);
        assert_eq!(mem.read_u32(0x1000), Err(Fault::NotMapped(0x1003)));
    }

    #[test]
    fn test_kernel_address_not_probed() {
        let mem = Flat::new(0x1000, &[0; 4]);
        assert_eq!(mem.read_byte(USER_TOP), Err(Fault::KernelAddress(USER_TOP)));
        assert_eq!(
            mem.write_byte(usize::MAX, 1),
            Err(Fault::KernelAddress(usize::MAX))
        );
        assert_eq!(mem.probes.get(), 0);
    }

    #[test]
    fn test_word_straddling_split() {
        let mem = Flat::new(USER_TOP - 2, &[0xAA, 0xBB]);
        assert_eq!(mem.read_u32(USER_TOP - 2), Err(Fault::KernelAddress(USER_TOP)));
    }

    #[test]
    fn test_read_cstr() {
        let mem = Flat::new(0x2000, b"hello\0world");
        assert_eq!(mem.read_cstr(0x2000, 64), Ok(Some(b"hello".to_vec())));
        assert_eq!(mem.read_cstr(0x2000, 5), Ok(None));
        assert_eq!(mem.read_cstr(0x2006, 64), Err(Fault::NotMapped(0x200b)));
    }

    #[test]
    fn test_copy_out_read_only() {
        let mem = Flat::new(0x2000, &[0; 8]);
        assert_eq!(mem.copy_out(0x2000, b"x"), Err(Fault::ReadOnly(0x2000)));
        assert_eq!(mem.copy_out(0x2000, b""), Ok(()));
    }
}
