//! Memory management for the system call layer
//!
//! Provides:
//! - User address types and the user/kernel split
//! - Fault-safe access to user memory
//! - A software user address space for hosted runs
//! - Kernel heap allocation
//!
//! # Security Principles
//! - User pointers are never dereferenced directly
//! - Kernel addresses are rejected before any probe
//! - A bad access is a value ([`Fault`]), not a kernel exception

mod address;
mod allocator;
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod probe;
mod space;
mod user;

pub use address::{UserAddr, PAGE_SIZE, USER_TOP};
pub use allocator::{heap_free, heap_size, init_heap};
#[cfg(all(target_arch = "aarch64", target_os = "none"))]
pub use probe::ProbedUserMemory;
pub use space::{PageFlags, UserSpace};
pub use user::{Fault, UserMemory};
