//! Process Control Collaborator Interface
//!
//! Loading, scheduling and teardown of sessions live outside this crate.

use core::fmt;

/// Identifier of a running user program.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SessionId(i32);

impl SessionId {
    /// Wrap a raw session id.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw id, as returned to user programs.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operations the system call layer needs from process management.
pub trait ProcessControl: Sync {
    /// Session whose thread trapped into the kernel.
    fn current(&self) -> SessionId;

    /// Start a new session from a command line.
    ///
    /// Returns None if the program could not be loaded.
    fn start_session(&self, command: &str) -> Option<SessionId>;

    /// Block until `child` exits and return its status.
    ///
    /// Returns None if `child` is not a waitable child of the caller.
    fn wait_for(&self, child: SessionId) -> Option<i32>;

    /// End the current session with `status`. Does not return.
    fn terminate_current(&self, status: i32) -> !;

    /// Power the machine down.
    fn power_off(&self) -> !;
}
