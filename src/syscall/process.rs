//! Process control calls: halt, exit, exec, wait

use crate::drivers::Console;
use crate::fs::FileSystem;
use crate::mm::{UserAddr, UserMemory};
use crate::process::{ProcessControl, SessionId};

use super::error::SyscallError;
use super::handler::{Outcome, Syscalls};

impl<F, P, C, M> Syscalls<F, P, C, M>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    M: UserMemory,
{
    pub(super) fn sys_halt(&self) -> Outcome {
        log::info!("syscall: halt requested, powering off");
        Outcome::PowerOff
    }

    /// Exit system call
    ///
    /// Any status is acceptable; the session's descriptors are released
    /// before the process collaborator tears it down.
    pub(super) fn sys_exit(&self, session: SessionId, status: i32) -> Outcome {
        log::info!("{}: exit({})", session, status);
        self.release_session(session);
        Outcome::Exit(status)
    }

    /// Exec system call
    ///
    /// Returns the new session id, or -1 if it could not be started.
    pub(super) fn sys_exec(&self, command: UserAddr) -> Result<i32, SyscallError> {
        let command = self.user_string(command)?;
        match self.process.start_session(&command) {
            Some(child) => Ok(child.raw()),
            None => {
                log::debug!("syscall: exec '{}' failed", command);
                Ok(-1)
            }
        }
    }

    /// Wait system call
    ///
    /// Blocks in the process collaborator until `child` exits.
    pub(super) fn sys_wait(&self, child: SessionId) -> Result<i32, SyscallError> {
        Ok(self.process.wait_for(child).unwrap_or(-1))
    }
}
