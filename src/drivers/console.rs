//! Console Collaborator Interface

/// The kernel console used for descriptors 0 and 1.
pub trait Console: Sync {
    /// Write one chunk of bytes.
    ///
    /// Callers never pass more than the configured console chunk limit.
    fn write_chunk(&self, bytes: &[u8]);

    /// Block until one byte of input is available and return it.
    fn read_byte(&self) -> u8;
}

impl<C: Console + ?Sized> Console for &C {
    fn write_chunk(&self, bytes: &[u8]) {
        (**self).write_chunk(bytes)
    }

    fn read_byte(&self) -> u8 {
        (**self).read_byte()
    }
}
