//! Filesystem Collaborator Interface
//!
//! The on-disk filesystem is not part of this crate. The system call layer
//! only needs the operations below, and always calls them while holding
//! the filesystem lock (the `spin::Mutex` that owns the implementation),
//! so every method may take `&mut self`.

/// Operations the system call layer needs from the filesystem.
pub trait FileSystem: Send {
    /// Reference to an open file.
    ///
    /// Cloning produces another reference to the same open file; exactly
    /// one reference per open is handed back through [`FileSystem::close`].
    type File: Clone + Send;

    /// Open the named file. Returns None if it does not exist.
    fn open(&mut self, name: &str) -> Option<Self::File>;

    /// Create a file of `initial_size` bytes.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Remove the named file.
    fn remove(&mut self, name: &str) -> bool;

    /// Read at the file cursor into `buf`, returning bytes read.
    fn read(&mut self, file: &Self::File, buf: &mut [u8]) -> usize;

    /// Write `buf` at the file cursor, returning bytes written.
    fn write(&mut self, file: &Self::File, buf: &[u8]) -> usize;

    /// Move the file cursor.
    fn seek(&mut self, file: &Self::File, position: u32);

    /// Current file cursor.
    fn tell(&mut self, file: &Self::File) -> u32;

    /// File length in bytes.
    fn length(&mut self, file: &Self::File) -> u32;

    /// Release an open file.
    fn close(&mut self, file: Self::File);
}
