#![forbid(unsafe_code)]

//! `tracing` output routed to the browser console.
//!
//! The fmt layer asks for one writer per event; [`ConsoleWriter`] buffers the
//! formatted line and hands it to a sink function when dropped, along with
//! the event level so the sink can pick `console.error`, `console.warn` and
//! so on.

use std::io;

use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::fmt::MakeWriter;

/// Receives one formatted line per event.
pub type Sink = fn(Level, &str);

/// Buffers one formatted event.
#[derive(Debug)]
pub struct ConsoleWriter {
    sink: Sink,
    level: Level,
    buffer: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end();
        if !line.is_empty() {
            (self.sink)(self.level, line);
        }
    }
}

/// [`MakeWriter`] producing a [`ConsoleWriter`] per event.
#[derive(Debug, Clone, Copy)]
pub struct MakeConsoleWriter {
    sink: Sink,
}

impl MakeConsoleWriter {
    #[must_use]
    pub const fn new(sink: Sink) -> Self {
        Self { sink }
    }

    fn writer(&self, level: Level) -> ConsoleWriter {
        ConsoleWriter {
            sink: self.sink,
            level,
            buffer: Vec::new(),
        }
    }
}

impl<'a> MakeWriter<'a> for MakeConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.writer(*meta.level())
    }
}

/// A fmt subscriber writing plain lines (no timestamps, no ANSI) to `sink`.
pub fn subscriber(sink: Sink, max_level: Level) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_writer(MakeConsoleWriter::new(sink))
        .without_time()
        .with_ansi(false)
        .with_target(true)
        .with_max_level(max_level)
        .finish()
}

/// Install [`subscriber`] globally. Later calls are ignored.
pub fn init(sink: Sink, max_level: Level) {
    let _ = tracing::subscriber::set_global_default(subscriber(sink, max_level));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    thread_local! {
        static LINES: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    fn capture(level: Level, line: &str) {
        LINES.with(|lines| lines.borrow_mut().push((level, line.to_owned())));
    }

    fn take_lines() -> Vec<(Level, String)> {
        LINES.with(|lines| lines.borrow_mut().drain(..).collect())
    }

    #[test]
    fn one_line_per_event_with_level() {
        take_lines();
        tracing::subscriber::with_default(subscriber(capture, Level::DEBUG), || {
            tracing::warn!(target: "aberration_web", selector = "h1", "skipping selector");
            tracing::debug!(target: "aberration_web", "booted");
        });
        let lines = take_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, Level::WARN);
        assert!(lines[0].1.contains("aberration_web"));
        assert!(lines[0].1.contains("skipping selector"));
        assert!(lines[0].1.contains("selector=\"h1\""));
        assert_eq!(lines[1].0, Level::DEBUG);
        assert!(!lines[1].1.contains('\x1b'));
    }

    #[test]
    fn max_level_filters() {
        take_lines();
        tracing::subscriber::with_default(subscriber(capture, Level::INFO), || {
            tracing::debug!("dropped");
            tracing::trace!("dropped");
            tracing::info!("kept");
        });
        let lines = take_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].1.ends_with("kept"));
    }

    #[test]
    fn empty_writes_emit_nothing() {
        take_lines();
        let writer = MakeConsoleWriter::new(capture);
        drop(writer.make_writer());
        assert!(take_lines().is_empty());
    }
}
