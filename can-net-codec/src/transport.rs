//! Transport abstractions
//!
//! A transport is split into two independently owned halves:
//! - a [`LineSource`] performing blocking line reads, moved into the reader
//!   worker,
//! - a [`FrameSink`] writing PDUs, owned by the event loop.
//!
//! Neither half is shared between threads, so reads in flight never race
//! with writes on the same handle.

use crate::frame::OutgoingFrame;
use std::io::{self, BufRead, Read, Write};

/// Longest line accepted from a transport, newline included
pub const MAX_LINE_LEN: u64 = 100;

/// Blocking line-oriented input
pub trait LineSource: Send + 'static {
    /// Read the next line; `Ok(None)` at end of stream
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Frame output
pub trait FrameSink: Send {
    fn write_frame(&mut self, frame: &OutgoingFrame) -> io::Result<()>;
}

impl<W: Write + Send> FrameSink for W {
    fn write_frame(&mut self, frame: &OutgoingFrame) -> io::Result<()> {
        self.write_all(frame.to_pdu().as_bytes())?;
        self.flush()
    }
}

/// Line source over any buffered reader
///
/// Lines longer than [`MAX_LINE_LEN`] are split. Read timeouts (as reported by
/// serial ports configured with one) are retried, so a read blocks until a
/// full line or end of stream.
pub struct BufLineSource<R> {
    reader: R,
}

impl<R: BufRead + Send + 'static> BufLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead + Send + 'static> LineSource for BufLineSource<R> {
    fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();

        loop {
            let remaining = MAX_LINE_LEN - line.len() as u64;
            match (&mut self.reader).take(remaining).read_until(b'\n', &mut line) {
                Ok(0) if line.is_empty() => return Ok(None),
                Ok(_) => return Ok(Some(line)),
                Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                    log::trace!("Transport read timed out, retrying");
                    if line.len() as u64 >= MAX_LINE_LEN {
                        return Ok(Some(line));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_until_eof() {
        let mut source = BufLineSource::new(Cursor::new(b"first\nsecond\nlast".to_vec()));

        assert_eq!(source.read_line().unwrap(), Some(b"first\n".to_vec()));
        assert_eq!(source.read_line().unwrap(), Some(b"second\n".to_vec()));
        assert_eq!(source.read_line().unwrap(), Some(b"last".to_vec()));
        assert_eq!(source.read_line().unwrap(), None);
    }

    #[test]
    fn test_long_lines_are_split() {
        let mut data = vec![b'A'; 150];
        data.push(b'\n');
        let mut source = BufLineSource::new(Cursor::new(data));

        assert_eq!(source.read_line().unwrap().unwrap().len(), 100);
        assert_eq!(source.read_line().unwrap().unwrap().len(), 51);
    }

    #[test]
    fn test_writer_sink_emits_pdu() {
        let mut out: Vec<u8> = Vec::new();
        out.write_frame(&OutgoingFrame::new(0x0100_2013, 0x1234)).unwrap();
        assert_eq!(out, b"132000013412000000000000A5\n".to_vec());
    }
}
