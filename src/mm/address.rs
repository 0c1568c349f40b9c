//! User Virtual Address Types
//!
//! Type-safe wrapper for addresses supplied by user programs.
//!
//! # Security Properties
//! - A `UserAddr` can only be built for an address below [`USER_TOP`]
//! - Arithmetic is checked and never wraps into kernel space
//! - Raw pointers are only produced through an explicit unsafe conversion

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// User/kernel split for the 32-bit user ABI.
///
/// Everything at or above this address belongs to the kernel.
pub const USER_TOP: usize = 0xC000_0000;

/// A virtual address inside user space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct UserAddr(usize);

impl UserAddr {
    /// Create a user address.
    ///
    /// Returns None if the address is at or above the user/kernel split.
    #[inline]
    pub const fn new(addr: usize) -> Option<Self> {
        if addr < USER_TOP {
            Some(Self(addr))
        } else {
            None
        }
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Add an offset, staying inside user space.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Self::new(addr),
            None => None,
        }
    }

    /// Get the page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Convert to a raw pointer.
    ///
    /// # Safety
    /// The caller must ensure the address is mapped and accessible.
    #[inline]
    pub const unsafe fn as_ptr(self) -> *const u8 {
        self.0 as *const u8
    }

    /// Convert to a mutable raw pointer.
    ///
    /// # Safety
    /// The caller must ensure the address is mapped and writable.
    #[inline]
    pub const unsafe fn as_mut_ptr(self) -> *mut u8 {
        self.0 as *mut u8
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
