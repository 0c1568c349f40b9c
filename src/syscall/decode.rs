//! System Call Decoding
//!
//! Turns the words a user program pushed before trapping into a typed
//! [`Syscall`]. The call number sits at the user stack pointer; each
//! argument occupies the next 32-bit slot.
//!
//! ```text
//!   sp + 12 ─► argument 3
//!   sp +  8 ─► argument 2
//!   sp +  4 ─► argument 1
//!   sp      ─► call number
//! ```

use crate::fd::Fd;
use crate::mm::{Fault, UserAddr, UserMemory};
use crate::process::SessionId;

use super::error::SyscallError;
use super::validate::{validate_user_ptr, validate_user_range, UserBuffer};

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
}

/// Width of one argument slot on the user stack.
pub const WORD_SIZE: usize = 4;

/// A decoded system call with validated arguments.
///
/// Pointers are known to lie in user space; the bytes they point at are
/// read by the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: i32 },
    Exec { command: UserAddr },
    Wait { child: SessionId },
    Create { name: UserAddr, initial_size: u32 },
    Remove { name: UserAddr },
    Open { name: UserAddr },
    Filesize { fd: Fd },
    Read { fd: Fd, buffer: UserBuffer },
    Write { fd: Fd, buffer: UserBuffer },
    Seek { fd: Fd, position: u32 },
    Tell { fd: Fd },
    Close { fd: Fd },
}

impl Syscall {
    /// Call name, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Exit { .. } => "exit",
            Self::Exec { .. } => "exec",
            Self::Wait { .. } => "wait",
            Self::Create { .. } => "create",
            Self::Remove { .. } => "remove",
            Self::Open { .. } => "open",
            Self::Filesize { .. } => "filesize",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Seek { .. } => "seek",
            Self::Tell { .. } => "tell",
            Self::Close { .. } => "close",
        }
    }

    /// Value returned to the caller when the call fails recoverably.
    ///
    /// Boolean calls report `false`; everything else reports -1.
    pub const fn error_sentinel(&self) -> i32 {
        match self {
            Self::Create { .. } | Self::Remove { .. } => 0,
            _ => -1,
        }
    }
}

/// Reads consecutive argument slots above the call number.
struct ArgReader<'m, M: ?Sized> {
    memory: &'m M,
    sp: usize,
    slot: usize,
}

impl<'m, M: UserMemory + ?Sized> ArgReader<'m, M> {
    fn new(memory: &'m M, sp: usize) -> Self {
        Self {
            memory,
            sp,
            slot: 0,
        }
    }

    fn word(&mut self) -> Result<u32, Fault> {
        let offset = self.slot.checked_mul(WORD_SIZE).ok_or(Fault::Overflow)?;
        let addr = self.sp.checked_add(offset).ok_or(Fault::Overflow)?;
        self.slot += 1;
        self.memory.read_u32(addr)
    }

    fn int(&mut self) -> Result<i32, Fault> {
        self.word().map(|w| w as i32)
    }

    fn fd(&mut self) -> Result<Fd, Fault> {
        self.int().map(Fd::new)
    }

    fn ptr(&mut self) -> Result<UserAddr, Fault> {
        validate_user_ptr(self.word()?)
    }

    /// A buffer pointer followed by its size.
    fn buffer(&mut self) -> Result<UserBuffer, Fault> {
        let ptr = self.word()?;
        let len = self.word()?;
        validate_user_range(ptr, len)
    }
}

/// Read the call number and its arguments from the user stack at `sp`.
pub fn decode<M: UserMemory + ?Sized>(memory: &M, sp: usize) -> Result<Syscall, SyscallError> {
    use numbers::*;

    let mut args = ArgReader::new(memory, sp);
    let number = args.word()?;

    let call = match number {
        SYS_HALT => Syscall::Halt,
        SYS_EXIT => Syscall::Exit { status: args.int()? },
        SYS_EXEC => Syscall::Exec { command: args.ptr()? },
        SYS_WAIT => Syscall::Wait {
            child: SessionId::new(args.int()?),
        },
        SYS_CREATE => Syscall::Create {
            name: args.ptr()?,
            initial_size: args.word()?,
        },
        SYS_REMOVE => Syscall::Remove { name: args.ptr()? },
        SYS_OPEN => Syscall::Open { name: args.ptr()? },
        SYS_FILESIZE => Syscall::Filesize { fd: args.fd()? },
        SYS_READ => Syscall::Read {
            fd: args.fd()?,
            buffer: args.buffer()?,
        },
        SYS_WRITE => Syscall::Write {
            fd: args.fd()?,
            buffer: args.buffer()?,
        },
        SYS_SEEK => Syscall::Seek {
            fd: args.fd()?,
            position: args.word()?,
        },
        SYS_TELL => Syscall::Tell { fd: args.fd()? },
        SYS_CLOSE => Syscall::Close { fd: args.fd()? },
        _ => return Err(SyscallError::UnknownCall(number)),
    };

    Ok(call)
}
