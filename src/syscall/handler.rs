//! System Call Handler
//!
//! Owns the subsystem state (descriptor table, filesystem lock and the
//! collaborators) and routes decoded calls to their handlers.
//!
//! # Security Considerations
//! - Unknown call numbers terminate the caller without running a handler
//! - A fault while decoding or while touching a user buffer terminates the
//!   caller; no lock is held at any point where user memory is touched
//! - Recoverable failures become a sentinel return value

use alloc::string::String;
use alloc::vec::Vec;
use spin::Mutex;

use crate::config::SyscallConfig;
use crate::drivers::Console;
use crate::exception::{SyscallEntry, TrapFrame};
use crate::fd::FdTable;
use crate::fs::FileSystem;
use crate::mm::{UserAddr, UserMemory};
use crate::process::{ProcessControl, SessionId};

use super::decode::{decode, Syscall};
use super::error::SyscallError;

/// What the trap path must do once a call has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Store the value in the return register and resume the caller.
    Return(i32),
    /// Terminate the caller with this status.
    Exit(i32),
    /// Power the machine down.
    PowerOff,
}

/// The system call subsystem.
///
/// # Type Parameters
/// * `F` - filesystem, owned by the filesystem lock
/// * `P` - process control
/// * `C` - console for descriptors 0 and 1
/// * `M` - user memory of the trapping session
pub struct Syscalls<F: FileSystem, P, C, M> {
    pub(super) fs: Mutex<F>,
    pub(super) files: FdTable<F::File>,
    pub(super) process: P,
    pub(super) console: C,
    pub(super) memory: M,
    pub(super) config: SyscallConfig,
}

impl<F, P, C, M> Syscalls<F, P, C, M>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    M: UserMemory,
{
    /// Create the subsystem with default limits.
    pub fn new(fs: F, process: P, console: C, memory: M) -> Self {
        Self::with_config(fs, process, console, memory, SyscallConfig::default())
    }

    /// Create the subsystem with explicit limits.
    pub fn with_config(fs: F, process: P, console: C, memory: M, config: SyscallConfig) -> Self {
        Self {
            fs: Mutex::new(fs),
            files: FdTable::new(config.max_open_files),
            process,
            console,
            memory,
            config,
        }
    }

    /// The descriptor table.
    pub fn files(&self) -> &FdTable<F::File> {
        &self.files
    }

    /// The filesystem behind its lock.
    pub fn filesystem(&self) -> &Mutex<F> {
        &self.fs
    }

    /// Process control collaborator.
    pub fn process(&self) -> &P {
        &self.process
    }

    /// Console collaborator.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// User memory accessor.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Active limits.
    pub fn config(&self) -> &SyscallConfig {
        &self.config
    }

    /// Decode and run the call described by `frame`.
    ///
    /// The frame is only read; [`Syscalls::handle_trap`] applies the outcome.
    pub fn dispatch(&self, frame: &TrapFrame) -> Outcome {
        let session = self.process.current();

        let call = match decode(&self.memory, frame.user_sp()) {
            Ok(call) => call,
            Err(err) => return self.kill(session, err),
        };
        log::trace!("syscall: session {} {:?}", session, call);

        let outcome = match call {
            Syscall::Halt => return self.sys_halt(),
            Syscall::Exit { status } => return self.sys_exit(session, status),
            Syscall::Exec { command } => self.sys_exec(command),
            Syscall::Wait { child } => self.sys_wait(child),
            Syscall::Create { name, initial_size } => self.sys_create(name, initial_size),
            Syscall::Remove { name } => self.sys_remove(name),
            Syscall::Open { name } => self.sys_open(session, name),
            Syscall::Filesize { fd } => self.sys_filesize(session, fd),
            Syscall::Read { fd, buffer } => self.sys_read(session, fd, buffer),
            Syscall::Write { fd, buffer } => self.sys_write(session, fd, buffer),
            Syscall::Seek { fd, position } => self.sys_seek(session, fd, position),
            Syscall::Tell { fd } => self.sys_tell(session, fd),
            Syscall::Close { fd } => self.sys_close(session, fd),
        };

        match outcome {
            Ok(value) => Outcome::Return(value),
            Err(err) if err.is_fatal() => self.kill(session, err),
            Err(err) => {
                log::debug!("syscall: {} failed: {}", call.name(), err);
                Outcome::Return(call.error_sentinel())
            }
        }
    }

    /// Handle a system call trap and apply its outcome.
    ///
    /// Returns only when the caller is resumed.
    pub fn handle_trap(&self, frame: &mut TrapFrame) {
        match self.dispatch(frame) {
            Outcome::Return(value) => frame.set_return(value),
            Outcome::Exit(status) => self.process.terminate_current(status),
            Outcome::PowerOff => self.process.power_off(),
        }
    }

    /// Close every descriptor held by `session`.
    ///
    /// Called on every path that ends a session.
    pub fn release_session(&self, session: SessionId) -> usize {
        self.files.release_session(&self.fs, session)
    }

    /// Terminate `session` for a fatal error.
    fn kill(&self, session: SessionId, err: SyscallError) -> Outcome {
        log::warn!("syscall: killing session {}: {}", session, err);
        self.release_session(session);
        Outcome::Exit(-1)
    }

    /// Read a NUL-terminated user string as UTF-8.
    pub(super) fn user_string(&self, addr: UserAddr) -> Result<String, SyscallError> {
        let bytes: Vec<u8> = self
            .memory
            .read_cstr(addr.as_usize(), self.config.max_string_len)?
            .ok_or(SyscallError::StringTooLong)?;
        String::from_utf8(bytes).map_err(|_| SyscallError::InvalidName)
    }
}

impl<F, P, C, M> SyscallEntry for Syscalls<F, P, C, M>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    M: UserMemory + Sync,
{
    fn handle_trap(&self, frame: &mut TrapFrame) {
        Syscalls::handle_trap(self, frame)
    }

    fn abort_current(&self, frame: &TrapFrame) -> ! {
        let session = self.process.current();
        log::warn!(
            "syscall: session {} aborted at {:#x} (ESR {:#x})",
            session,
            frame.far,
            frame.esr
        );
        self.release_session(session);
        self.process.terminate_current(-1)
    }
}
