//! Tunables for the system call layer

use crate::mm::PAGE_SIZE;

/// Limits applied by the system call handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallConfig {
    /// Largest buffer handed to the console in a single write.
    pub console_chunk: usize,
    /// Size of the kernel bounce buffer used for file reads and writes.
    pub io_chunk: usize,
    /// Maximum number of live descriptors in the table.
    pub max_open_files: usize,
    /// Longest user string accepted, terminating NUL included.
    pub max_string_len: usize,
}

impl SyscallConfig {
    /// Default limits.
    pub const fn new() -> Self {
        Self {
            console_chunk: 300,
            io_chunk: 512,
            max_open_files: 128,
            max_string_len: PAGE_SIZE,
        }
    }
}

impl Default for SyscallConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyscallConfig::default();
        assert_eq!(config.console_chunk, 300);
        assert_eq!(config.max_string_len, 4096);
        assert!(config.io_chunk > 0);
        assert!(config.max_open_files > 0);
    }
}
