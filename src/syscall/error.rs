//! System call error taxonomy

use core::fmt;

use crate::fd::{Fd, FdError};
use crate::mm::Fault;

/// Why a system call did not complete normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    /// Invalid or unmapped user memory. Fatal.
    MemoryFault(Fault),
    /// Call number outside the supported set. Fatal.
    UnknownCall(u32),
    /// User string without a NUL inside the length limit. Fatal.
    StringTooLong,
    /// Descriptor not live for this session, or not usable for this call.
    BadDescriptor(Fd),
    /// Named file does not exist.
    NotFound,
    /// Name or command line is not valid UTF-8.
    InvalidName,
    /// No descriptor could be allocated.
    AllocationFailure,
}

impl SyscallError {
    /// Fatal errors terminate the calling session; the rest become a
    /// sentinel return value.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MemoryFault(_) | Self::UnknownCall(_) | Self::StringTooLong
        )
    }
}

impl From<Fault> for SyscallError {
    fn from(fault: Fault) -> Self {
        Self::MemoryFault(fault)
    }
}

impl From<FdError> for SyscallError {
    fn from(err: FdError) -> Self {
        match err {
            FdError::NotFound => Self::NotFound,
            FdError::TableFull | FdError::Exhausted => Self::AllocationFailure,
        }
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryFault(fault) => write!(f, "memory fault: {}", fault),
            Self::UnknownCall(number) => write!(f, "unknown system call {}", number),
            Self::StringTooLong => write!(f, "unterminated user string"),
            Self::BadDescriptor(fd) => write!(f, "bad file descriptor {}", fd),
            Self::NotFound => write!(f, "no such file"),
            Self::InvalidName => write!(f, "name is not valid UTF-8"),
            Self::AllocationFailure => write!(f, "cannot allocate descriptor"),
        }
    }
}
