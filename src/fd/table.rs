//! Open File Descriptor Table
//!
//! Maps small integer descriptors to open files.
//!
//! # Design
//! - Descriptors come from a monotonic counter seeded at 3 and are never reused
//! - Entries are keyed by descriptor and tagged with their owning session
//! - The entry map has its own lock; the filesystem lock is taken separately
//!
//! # Lock Order
//! `open` takes the filesystem lock and the table lock one after the other,
//! never both. `close` and `release_session` hold the table lock while briefly
//! taking the filesystem lock. No path takes the table lock while holding the
//! filesystem lock.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicI32, Ordering};
use spin::Mutex;

use crate::fs::FileSystem;
use crate::process::SessionId;

/// A file descriptor as seen by user programs.
///
/// Newtype so arbitrary integers are not mixed up with descriptors.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fd(i32);

impl Fd {
    /// Standard input (console keyboard).
    pub const STDIN: Self = Self(0);

    /// Standard output (console).
    pub const STDOUT: Self = Self(1);

    /// Standard error. Reserved, never allocated.
    pub const STDERR: Self = Self(2);

    /// First descriptor handed out by the table.
    pub const FIRST_USER: Self = Self(3);

    /// Wrap a raw descriptor value.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Check for one of the three standard descriptors.
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 >= 0 && self.0 < Self::FIRST_USER.0
    }
}

impl fmt::Debug for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fd({})", self.0)
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// No live descriptor (or no such file on open).
    NotFound,
    /// The table holds its maximum number of entries.
    TableFull,
    /// The descriptor counter has run out of values.
    Exhausted,
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "descriptor not found"),
            Self::TableFull => write!(f, "descriptor table full"),
            Self::Exhausted => write!(f, "descriptor space exhausted"),
        }
    }
}

struct Entry<H> {
    owner: SessionId,
    file: H,
}

/// The descriptor table.
///
/// `H` is the filesystem's open-file reference.
pub struct FdTable<H> {
    entries: Mutex<BTreeMap<Fd, Entry<H>>>,
    next: AtomicI32,
    capacity: usize,
}

impl<H: Clone> FdTable<H> {
    /// Create an empty table holding at most `capacity` descriptors.
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            next: AtomicI32::new(Fd::FIRST_USER.0),
            capacity,
        }
    }

    /// Open `name` and give it a descriptor owned by `owner`.
    ///
    /// If no descriptor can be allocated, the file is closed again before
    /// returning, so a failed open never leaks an open file.
    pub fn open<F>(&self, fs: &Mutex<F>, owner: SessionId, name: &str) -> Result<Fd, FdError>
    where
        F: FileSystem<File = H>,
    {
        let file = fs.lock().open(name).ok_or(FdError::NotFound)?;

        match self.insert(owner, file) {
            Ok(fd) => Ok(fd),
            Err((err, file)) => {
                fs.lock().close(file);
                Err(err)
            }
        }
    }

    /// Allocate the next descriptor for an already open file.
    ///
    /// On failure the file is handed back to the caller.
    pub fn insert(&self, owner: SessionId, file: H) -> Result<Fd, (FdError, H)> {
        let raw = match self
            .next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_add(1))
        {
            Ok(raw) => raw,
            Err(_) => return Err((FdError::Exhausted, file)),
        };
        let fd = Fd(raw);

        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            return Err((FdError::TableFull, file));
        }
        entries.insert(fd, Entry { owner, file });
        log::debug!("fd: session {} opened {}", owner, fd);
        Ok(fd)
    }

    /// Look up a live descriptor owned by `owner`.
    pub fn retrieve(&self, owner: SessionId, fd: Fd) -> Result<H, FdError> {
        let entries = self.entries.lock();
        match entries.get(&fd) {
            Some(entry) if entry.owner == owner => Ok(entry.file.clone()),
            _ => Err(FdError::NotFound),
        }
    }

    /// Unlink a descriptor and close its file.
    ///
    /// Closing a descriptor that is not live (never opened, already closed,
    /// or owned by another session) reports `NotFound`.
    pub fn close<F>(&self, fs: &Mutex<F>, owner: SessionId, fd: Fd) -> Result<(), FdError>
    where
        F: FileSystem<File = H>,
    {
        let mut entries = self.entries.lock();
        match entries.get(&fd) {
            Some(entry) if entry.owner == owner => {}
            _ => return Err(FdError::NotFound),
        }
        let entry = entries.remove(&fd).ok_or(FdError::NotFound)?;
        fs.lock().close(entry.file);
        log::debug!("fd: session {} closed {}", owner, fd);
        Ok(())
    }

    /// Close every descriptor owned by `owner`, returning how many were closed.
    pub fn release_session<F>(&self, fs: &Mutex<F>, owner: SessionId) -> usize
    where
        F: FileSystem<File = H>,
    {
        let mut entries = self.entries.lock();
        let owned: Vec<Fd> = entries
            .iter()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(&fd, _)| fd)
            .collect();
        if owned.is_empty() {
            return 0;
        }

        let mut fs = fs.lock();
        for fd in &owned {
            if let Some(entry) = entries.remove(fd) {
                fs.close(entry.file);
            }
        }
        log::debug!("fd: released {} descriptors of session {}", owned.len(), owner);
        owned.len()
    }

    /// Number of live descriptors.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check for an empty table.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of live descriptors.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
