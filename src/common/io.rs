use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use super::io_error_msg;

/// 256KB read buffer, matches the per-file buffer used when merging runs.
pub const READ_BUF_SIZE: usize = 256 * 1024;

/// 4MB buffer for output — reduces flush frequency for large reports.
pub const OUTPUT_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Open the input collaborator for streaming. `-` is standard input.
/// The error message carries the path so the caller can report it as-is.
pub fn open_input(path: &str) -> io::Result<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::with_capacity(
            READ_BUF_SIZE,
            io::stdin().lock(),
        )));
    }
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path, io_error_msg(&e))))?;
    Ok(Box::new(BufReader::with_capacity(READ_BUF_SIZE, file)))
}

/// Output writer enum to avoid Box<dyn Write> vtable dispatch overhead.
pub enum LineOutput {
    Stdout(BufWriter<io::StdoutLock<'static>>),
    File(BufWriter<File>),
}

impl LineOutput {
    /// Create (or truncate) the output destination. `-` is standard output.
    pub fn create(path: &str) -> io::Result<LineOutput> {
        if path == "-" {
            return Ok(LineOutput::Stdout(BufWriter::with_capacity(
                OUTPUT_BUF_SIZE,
                io::stdout().lock(),
            )));
        }
        let file = File::create(path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path, io_error_msg(&e))))?;
        Ok(LineOutput::File(BufWriter::with_capacity(OUTPUT_BUF_SIZE, file)))
    }
}

impl Write for LineOutput {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LineOutput::Stdout(w) => w.write(buf),
            LineOutput::File(w) => w.write(buf),
        }
    }
    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            LineOutput::Stdout(w) => w.write_all(buf),
            LineOutput::File(w) => w.write_all(buf),
        }
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            LineOutput::Stdout(w) => w.flush(),
            LineOutput::File(w) => w.flush(),
        }
    }
}

/// How a record read by `read_terminated` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordEnd {
    /// The reader was already at EOF; `buf` is empty.
    Eof,
    /// The delimiter was found and consumed.
    Delimited,
    /// Final record, cut off by EOF with no delimiter after it.
    Unterminated,
}

/// Read one delimiter-terminated record into `buf`, without the delimiter.
///
/// Returns `Ok(false)` only when the reader is already at EOF. A final record
/// with no trailing delimiter is still returned.
pub fn read_record<R: BufRead + ?Sized>(
    reader: &mut R,
    delimiter: u8,
    buf: &mut Vec<u8>,
) -> io::Result<bool> {
    Ok(read_terminated(reader, delimiter, buf)? != RecordEnd::Eof)
}

/// Like `read_record`, but also reports whether a delimiter ended the record.
/// Scans each buffered block with memchr instead of going byte by byte.
pub fn read_terminated<R: BufRead + ?Sized>(
    reader: &mut R,
    delimiter: u8,
    buf: &mut Vec<u8>,
) -> io::Result<RecordEnd> {
    buf.clear();
    let mut read_any = false;
    loop {
        let available = match reader.fill_buf() {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(if read_any {
                RecordEnd::Unterminated
            } else {
                RecordEnd::Eof
            });
        }
        read_any = true;
        match memchr::memchr(delimiter, available) {
            Some(pos) => {
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return Ok(RecordEnd::Delimited);
            }
            None => {
                let n = available.len();
                buf.extend_from_slice(available);
                reader.consume(n);
            }
        }
    }
}

/// Strip a trailing CR left over from CRLF input. Only meaningful for a
/// record that ended in `\n`.
#[inline]
pub fn strip_cr(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}
