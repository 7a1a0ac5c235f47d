use super::io::*;
use super::io_error_msg;
use std::io::{self, Cursor, Read};

fn records(input: &[u8], delimiter: u8) -> Vec<Vec<u8>> {
    let mut reader = Cursor::new(input.to_vec());
    let mut buf = Vec::new();
    let mut out = Vec::new();
    while read_record(&mut reader, delimiter, &mut buf).unwrap() {
        out.push(buf.clone());
    }
    out
}

#[test]
fn test_read_record_basic() {
    assert_eq!(
        records(b"a\nbb\nccc\n", b'\n'),
        vec![b"a".to_vec(), b"bb".to_vec(), b"ccc".to_vec()]
    );
}

#[test]
fn test_read_record_no_trailing_newline() {
    assert_eq!(records(b"a\nb", b'\n'), vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn test_read_record_empty_input() {
    assert!(records(b"", b'\n').is_empty());
}

#[test]
fn test_read_record_keeps_empty_lines() {
    assert_eq!(
        records(b"\n\nx\n", b'\n'),
        vec![Vec::new(), Vec::new(), b"x".to_vec()]
    );
}

#[test]
fn test_read_record_zero_terminated() {
    assert_eq!(
        records(b"a\nb\0c\0", b'\0'),
        vec![b"a\nb".to_vec(), b"c".to_vec()]
    );
}

#[test]
fn test_read_record_keeps_cr() {
    assert_eq!(records(b"a\r\n", b'\n'), vec![b"a\r".to_vec()]);
}

#[test]
fn test_read_terminated_reports_record_end() {
    let mut reader = Cursor::new(b"a\r\nb\r".to_vec());
    let mut buf = Vec::new();
    assert_eq!(
        read_terminated(&mut reader, b'\n', &mut buf).unwrap(),
        RecordEnd::Delimited
    );
    assert_eq!(buf, b"a\r");
    assert_eq!(
        read_terminated(&mut reader, b'\n', &mut buf).unwrap(),
        RecordEnd::Unterminated
    );
    assert_eq!(buf, b"b\r");
    assert_eq!(
        read_terminated(&mut reader, b'\n', &mut buf).unwrap(),
        RecordEnd::Eof
    );
    assert!(buf.is_empty());
}

/// Reader that hands out one byte per fill_buf, so records span many blocks.
struct Trickle {
    data: Vec<u8>,
    pos: usize,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[self.pos];
        self.pos += 1;
        Ok(1)
    }
}

#[test]
fn test_read_record_across_buffer_boundaries() {
    let inner = Trickle {
        data: b"hello\nworld\n".to_vec(),
        pos: 0,
    };
    let mut reader = io::BufReader::with_capacity(1, inner);
    let mut buf = Vec::new();
    assert!(read_record(&mut reader, b'\n', &mut buf).unwrap());
    assert_eq!(buf, b"hello");
    assert!(read_record(&mut reader, b'\n', &mut buf).unwrap());
    assert_eq!(buf, b"world");
    assert!(!read_record(&mut reader, b'\n', &mut buf).unwrap());
}

#[test]
fn test_strip_cr() {
    let mut line = b"abc\r".to_vec();
    strip_cr(&mut line);
    assert_eq!(line, b"abc");
    strip_cr(&mut line);
    assert_eq!(line, b"abc");
}

#[test]
fn test_io_error_msg_strips_os_error() {
    let e = io::Error::from_raw_os_error(2);
    let msg = io_error_msg(&e);
    assert!(!msg.contains("os error"), "got: {}", msg);
}

#[test]
fn test_open_input_missing_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.txt");
    let path = path.to_str().unwrap();
    let err = match open_input(path) {
        Ok(_) => panic!("expected open failure"),
        Err(e) => e,
    };
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
    assert!(err.to_string().contains("nope.txt"));
}
