use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const MAX_BUFFER_BYTES: usize = 256 * 1024;

/// Log lines kept in memory for the log panel.
#[derive(Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<String>>,
}

impl LogBuffer {
    pub fn contents(&self) -> String {
        self.inner.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.inner.lock() {
            s.clear();
        }
    }

    fn push(&self, text: &str) {
        if let Ok(mut s) = self.inner.lock() {
            s.push_str(text);
            if s.len() > MAX_BUFFER_BYTES {
                let mut cut = s.len() - MAX_BUFFER_BYTES;
                while !s.is_char_boundary(cut) {
                    cut += 1;
                }
                s.drain(..cut);
            }
        }
    }
}

pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

/// Installs the global subscriber: `RUST_LOG` filtering (default `info`),
/// output to stderr and to the returned buffer.
pub fn init() -> LogBuffer {
    let buffer = LogBuffer::default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_writer(buffer.clone().and(io::stderr))
        .try_init();

    if let Err(err) = result {
        eprintln!("logging already initialised: {}", err);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writer_appends_to_buffer() {
        let buffer = LogBuffer::default();
        let mut writer = buffer.make_writer();
        writer.write_all(b"first\n").unwrap();
        writer.write_all(b"second\n").unwrap();
        assert_eq!(buffer.contents(), "first\nsecond\n");

        buffer.clear();
        assert!(buffer.contents().is_empty());
    }

    #[test]
    fn buffer_is_bounded() {
        let buffer = LogBuffer::default();
        let line = "x".repeat(1024);
        for _ in 0..300 {
            buffer.push(&line);
        }
        assert!(buffer.contents().len() <= MAX_BUFFER_BYTES);
    }
}
