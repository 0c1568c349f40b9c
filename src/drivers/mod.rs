//! Console device for PantherOS user programs
//!
//! All drivers follow these security principles:
//! - Minimal unsafe code, well-documented
//! - No panics on invalid input

pub mod console;
pub mod uart;

pub use console::Console;
