//! File descriptors for user programs
//!
//! # Security Properties
//! - Descriptors 0-2 are reserved for the console and never allocated
//! - A descriptor is only visible to the session that opened it
//! - Every open file is closed exactly once, by `close` or session release

pub mod table;

pub use table::{Fd, FdError, FdTable};
