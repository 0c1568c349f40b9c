//! PantherOS User-Program System Call Boundary
//!
//! The layer that receives a trap from EL0 code, pulls the call number and
//! arguments off the caller's stack, and routes them to the kernel operation
//! that implements the call.
//!
//! # Security Model
//! - Every byte of caller memory goes through [`mm::UserMemory`]
//! - Invalid user memory terminates the session, never the kernel
//! - The descriptor table and the filesystem are each behind their own lock
//!
//! # Layout
//! - [`mm`]: user address types, fault-safe access, kernel heap
//! - [`fd`]: the open-file descriptor table
//! - [`syscall`]: decoding, dispatch and the call handlers
//! - [`exception`]: trap frame and the lower-EL entry point
//! - [`fs`], [`process`], [`drivers`]: collaborator interfaces
//! - [`logger`]: `log` backend writing to the console

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod config;
pub mod drivers;
pub mod exception;
pub mod fd;
pub mod fs;
pub mod logger;
pub mod mm;
pub mod process;
pub mod syscall;

#[cfg(test)]
mod testing;

pub use config::SyscallConfig;
pub use exception::TrapFrame;
pub use fd::{Fd, FdTable};
pub use syscall::{Outcome, Syscalls};
