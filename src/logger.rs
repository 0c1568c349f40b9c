//! Kernel log backend
//!
//! Implements the `log` facade on top of a [`Console`]. Records are
//! rendered as `[LEVEL target] message` and handed to the console in
//! chunks of at most [`CHUNK`] bytes, so a long record never holds the
//! device for longer than a user console write would.

use core::fmt::{self, Write};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::drivers::Console;

/// Largest slice handed to the console in one call.
pub const CHUNK: usize = 300;

/// `log` backend writing to a console.
pub struct ConsoleLogger<C> {
    console: C,
    level: LevelFilter,
}

impl<C: Console> ConsoleLogger<C> {
    /// Create a logger that drops records above `level`.
    pub const fn new(console: C, level: LevelFilter) -> Self {
        Self { console, level }
    }

    /// The console records are written to.
    pub fn console(&self) -> &C {
        &self.console
    }
}

impl<C: Console + Send> Log for ConsoleLogger<C> {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut out = ChunkWriter::new(&self.console);
        // ChunkWriter never fails; a formatting error only truncates the record
        let _ = writeln!(out, "[{} {}] {}", record.level(), record.target(), record.args());
        out.flush();
    }

    fn flush(&self) {}
}

/// Buffers formatted output and emits it in [`CHUNK`]-sized pieces.
struct ChunkWriter<'a, C: Console> {
    console: &'a C,
    buf: [u8; CHUNK],
    len: usize,
}

impl<'a, C: Console> ChunkWriter<'a, C> {
    fn new(console: &'a C) -> Self {
        Self {
            console,
            buf: [0; CHUNK],
            len: 0,
        }
    }

    fn flush(&mut self) {
        if self.len > 0 {
            self.console.write_chunk(&self.buf[..self.len]);
            self.len = 0;
        }
    }
}

impl<C: Console> Write for ChunkWriter<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut bytes = s.as_bytes();
        while !bytes.is_empty() {
            if self.len == CHUNK {
                self.flush();
            }
            let n = bytes.len().min(CHUNK - self.len);
            self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
            self.len += n;
            bytes = &bytes[n..];
        }
        Ok(())
    }
}

/// Install `logger` as the global `log` backend.
///
/// Fails if a logger has already been installed.
pub fn init(logger: &'static dyn Log, level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingConsole;
    use log::Level;

    fn emit(logger: &ConsoleLogger<RecordingConsole>, level: Level, message: &str) {
        logger.log(
            &Record::builder()
                .level(level)
                .target("fd")
                .args(format_args!("{}", message))
                .build(),
        );
    }

    #[test]
    fn test_record_format() {
        let logger = ConsoleLogger::new(RecordingConsole::default(), LevelFilter::Info);
        emit(&logger, Level::Warn, "table full");
        assert_eq!(logger.console().output(), b"[WARN fd] table full\n");
    }

    #[test]
    fn test_level_filter() {
        let logger = ConsoleLogger::new(RecordingConsole::default(), LevelFilter::Info);
        emit(&logger, Level::Debug, "dropped");
        emit(&logger, Level::Trace, "dropped");
        assert!(logger.console().chunks().is_empty());
        assert!(logger.enabled(&Metadata::builder().level(Level::Error).build()));
    }

    #[test]
    fn test_long_record_is_chunked() {
        let logger = ConsoleLogger::new(RecordingConsole::default(), LevelFilter::Trace);
        let message = "x".repeat(700);
        emit(&logger, Level::Info, &message);

        let chunks = logger.console().chunks();
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|chunk| chunk.len() <= CHUNK));
        let expected = format!("[INFO fd] {}\n", message);
        assert_eq!(logger.console().output(), expected.as_bytes());
    }
}
