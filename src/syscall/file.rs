//! Filesystem calls: create, remove, open, filesize, read, write, seek,
//! tell, close
//!
//! Data moves between user memory and the filesystem through a kernel
//! bounce buffer. User memory is only touched while no lock is held; the
//! filesystem lock is held only around the collaborator call itself.

use alloc::vec;

use crate::drivers::Console;
use crate::fd::Fd;
use crate::fs::FileSystem;
use crate::mm::{UserAddr, UserMemory};
use crate::process::{ProcessControl, SessionId};

use super::error::SyscallError;
use super::handler::Syscalls;
use super::validate::UserBuffer;

/// Clamp a byte count to the return register.
fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

impl<F, P, C, M> Syscalls<F, P, C, M>
where
    F: FileSystem,
    P: ProcessControl,
    C: Console,
    M: UserMemory,
{
    /// Look up a descriptor for the current session.
    ///
    /// The console descriptors are never in the table, so they fail here.
    fn file(&self, session: SessionId, fd: Fd) -> Result<F::File, SyscallError> {
        self.files.retrieve(session, fd).map_err(|_| {
            log::warn!("syscall: session {} used bad descriptor {}", session, fd);
            SyscallError::BadDescriptor(fd)
        })
    }

    pub(super) fn sys_create(&self, name: UserAddr, initial_size: u32) -> Result<i32, SyscallError> {
        let name = self.user_string(name)?;
        let created = self.fs.lock().create(&name, initial_size);
        Ok(created as i32)
    }

    pub(super) fn sys_remove(&self, name: UserAddr) -> Result<i32, SyscallError> {
        let name = self.user_string(name)?;
        let removed = self.fs.lock().remove(&name);
        Ok(removed as i32)
    }

    pub(super) fn sys_open(&self, session: SessionId, name: UserAddr) -> Result<i32, SyscallError> {
        let name = self.user_string(name)?;
        let fd = self.files.open(&self.fs, session, &name)?;
        Ok(fd.raw())
    }

    pub(super) fn sys_filesize(&self, session: SessionId, fd: Fd) -> Result<i32, SyscallError> {
        let file = self.file(session, fd)?;
        let length = self.fs.lock().length(&file);
        Ok(count(length as usize))
    }

    /// Read system call
    ///
    /// Descriptor 0 reads console input byte by byte; other descriptors
    /// read the file in bounce-buffer sized pieces until `size` bytes are
    /// transferred or the file runs out.
    pub(super) fn sys_read(
        &self,
        session: SessionId,
        fd: Fd,
        buffer: UserBuffer,
    ) -> Result<i32, SyscallError> {
        if fd == Fd::STDIN {
            for i in 0..buffer.len() {
                let byte = self.console.read_byte();
                self.memory.write_byte(buffer.addr() + i, byte)?;
            }
            return Ok(count(buffer.len()));
        }

        let file = self.file(session, fd)?;
        let mut bounce = vec![0u8; self.config.io_chunk.max(1)];
        let mut total = 0;

        for (addr, len) in buffer.chunks(bounce.len()) {
            let n = self.fs.lock().read(&file, &mut bounce[..len]);
            self.memory.copy_out(addr, &bounce[..n])?;
            total += n;
            if n < len {
                break;
            }
        }

        Ok(count(total))
    }

    /// Write system call
    ///
    /// Descriptor 1 goes to the console in chunks of at most the console
    /// limit; other descriptors go to the filesystem.
    pub(super) fn sys_write(
        &self,
        session: SessionId,
        fd: Fd,
        buffer: UserBuffer,
    ) -> Result<i32, SyscallError> {
        if fd == Fd::STDOUT {
            let mut chunk = vec![0u8; self.config.console_chunk.max(1)];
            for (addr, len) in buffer.chunks(chunk.len()) {
                self.memory.copy_in(addr, &mut chunk[..len])?;
                self.console.write_chunk(&chunk[..len]);
            }
            return Ok(count(buffer.len()));
        }

        let file = self.file(session, fd)?;
        let mut bounce = vec![0u8; self.config.io_chunk.max(1)];
        let mut total = 0;

        for (addr, len) in buffer.chunks(bounce.len()) {
            self.memory.copy_in(addr, &mut bounce[..len])?;
            let n = self.fs.lock().write(&file, &bounce[..len]);
            total += n;
            if n < len {
                break;
            }
        }

        Ok(count(total))
    }

    pub(super) fn sys_seek(&self, session: SessionId, fd: Fd, position: u32) -> Result<i32, SyscallError> {
        let file = self.file(session, fd)?;
        self.fs.lock().seek(&file, position);
        Ok(0)
    }

    pub(super) fn sys_tell(&self, session: SessionId, fd: Fd) -> Result<i32, SyscallError> {
        let file = self.file(session, fd)?;
        let position = self.fs.lock().tell(&file);
        Ok(count(position as usize))
    }

    /// Close system call
    ///
    /// Closing a descriptor that is not open returns -1; it is not fatal.
    pub(super) fn sys_close(&self, session: SessionId, fd: Fd) -> Result<i32, SyscallError> {
        self.files
            .close(&self.fs, session, fd)
            .map_err(|_| SyscallError::BadDescriptor(fd))?;
        Ok(0)
    }
}
