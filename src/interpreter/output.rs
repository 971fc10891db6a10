use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// In-memory output sink. Clones share the same buffer, so a caller can
/// hand one clone to the interpreter and read the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.bytes.borrow_mut().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Output sink tracking the cursor column for print-zone tabs.
pub(crate) struct Printer {
    sink: Box<dyn Write>,
    column: usize,
}

impl Printer {
    pub(crate) fn new(sink: Box<dyn Write>) -> Self {
        Self { sink, column: 0 }
    }

    pub(crate) fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.sink.write_all(text.as_bytes())?;
        match text.rfind('\n') {
            Some(index) => self.column = text[index + 1..].chars().count(),
            None => self.column += text.chars().count(),
        }
        Ok(())
    }

    /// Pad with spaces up to the start of the next `width`-column zone.
    pub(crate) fn next_zone(&mut self, width: usize) -> io::Result<()> {
        let width = width.max(1);
        let padding = width - self.column % width;
        self.write_str(&" ".repeat(padding))
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}
