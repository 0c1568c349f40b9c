//! System Call Interface
//!
//! Receives traps from user programs, decodes the call from the user
//! stack and runs the matching handler.
//!
//! # Security Model
//! - Whitelist approach: only the calls in [`numbers`] are accepted
//! - Every argument word is read through the fault-safe accessor
//! - Invalid memory or an unknown call terminates the session, never panics
//!
//! # Calls
//! - Process control: halt, exit, exec, wait
//! - Files: create, remove, open, filesize, read, write, seek, tell, close

mod decode;
mod error;
mod file;
mod handler;
mod process;
mod validate;

pub use decode::{decode, numbers, Syscall, WORD_SIZE};
pub use error::SyscallError;
pub use handler::{Outcome, Syscalls};
pub use validate::{validate_user_ptr, validate_user_range, Chunks, UserBuffer};
