//! Endian-aware primitive reads over an unbuffered seekable byte stream.

use crate::error::{ReaderError, Result};
use std::io::{Read, Seek, SeekFrom};

/// Reads primitives (integers, floats, newline-terminated strings) from a
/// seekable byte stream, tracking how many bytes have been consumed.
///
/// Every multi-byte read takes an explicit `big_endian` flag rather than
/// defaulting one way or the other — every real format this reader is used
/// for (lot header, lot pack, TDEF) is little-endian, and a silent default
/// is exactly the kind of footgun that causes a decoder to quietly misread a
/// file on a platform/format mismatch.
pub struct BinaryReader<R> {
    inner: R,
    bytes_read: u64,
}

macro_rules! read_int {
    ($name:ident, $t:ty) => {
        pub fn $name(&mut self, big_endian: bool) -> Result<$t> {
            let mut buf = [0u8; std::mem::size_of::<$t>()];
            self.read_exact_tracked(&mut buf)?;
            Ok(if big_endian {
                <$t>::from_be_bytes(buf)
            } else {
                <$t>::from_le_bytes(buf)
            })
        }
    };
}

impl<R: Read + Seek> BinaryReader<R> {
    pub fn new(inner: R) -> Self {
        BinaryReader { inner, bytes_read: 0 }
    }

    /// Total bytes consumed so far (for diagnostics).
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn read_exact_tracked(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(ReaderError::UnexpectedEof {
                        needed: buf.len(),
                        read: filled,
                    })
                }
                Ok(n) => {
                    filled += n;
                    self.bytes_read += n as u64;
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ReaderError::Io(e)),
            }
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact_tracked(&mut buf)?;
        Ok(buf[0])
    }

    read_int!(read_int16, i16);
    read_int!(read_int32, i32);
    read_int!(read_int64, i64);

    pub fn read_single(&mut self, big_endian: bool) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact_tracked(&mut buf)?;
        Ok(if big_endian {
            f32::from_be_bytes(buf)
        } else {
            f32::from_le_bytes(buf)
        })
    }

    pub fn read_double(&mut self, big_endian: bool) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact_tracked(&mut buf)?;
        Ok(if big_endian {
            f64::from_be_bytes(buf)
        } else {
            f64::from_le_bytes(buf)
        })
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact_tracked(&mut buf)?;
        Ok(buf)
    }

    /// Read UTF-8 bytes up to, and discarding, an ASCII `0x0A` newline. No
    /// length prefix. An embedded `\r` is kept verbatim (only `\n` ends the
    /// string).
    pub fn read_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let b = self.read_byte()?;
            if b == b'\n' {
                break;
            }
            bytes.push(b);
        }
        String::from_utf8(bytes).map_err(ReaderError::InvalidUtf8)
    }

    /// Peek the next byte without advancing the logical read position.
    pub fn peek_byte(&mut self) -> Result<u8> {
        let byte = self.read_byte()?;
        self.inner.seek(SeekFrom::Current(-1)).map_err(|e| ReaderError::BadSeek {
            offset: self.bytes_read.saturating_sub(1),
            source: e,
        })?;
        self.bytes_read -= 1;
        Ok(byte)
    }

    /// Seek to an absolute offset in the stream.
    pub fn seek_to(&mut self, offset: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(offset)).map_err(|e| ReaderError::BadSeek {
            offset,
            source: e,
        })?;
        self.bytes_read = offset;
        Ok(())
    }
}

#[test]
fn test_read_int32_little_endian() {
    let bytes = vec![0x02, 0x00, 0x00, 0x00];
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    assert_eq!(reader.read_int32(false).unwrap(), 2);
}

#[test]
fn test_read_int32_negative() {
    let bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    assert_eq!(reader.read_int32(false).unwrap(), -1);
}

#[test]
fn test_read_string_discards_newline() {
    let bytes = b"floor\nwall\n".to_vec();
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    assert_eq!(reader.read_string().unwrap(), "floor");
    assert_eq!(reader.read_string().unwrap(), "wall");
}

#[test]
fn test_read_string_empty() {
    let bytes = b"\n".to_vec();
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    assert_eq!(reader.read_string().unwrap(), "");
}

#[test]
fn test_peek_byte_does_not_advance() {
    let bytes = vec![7, 8, 9];
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    assert_eq!(reader.peek_byte().unwrap(), 7);
    assert_eq!(reader.bytes_read(), 0);
    assert_eq!(reader.read_byte().unwrap(), 7);
    assert_eq!(reader.read_byte().unwrap(), 8);
}

#[test]
fn test_short_read_is_unexpected_eof() {
    let bytes = vec![0x01, 0x00];
    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    let err = reader.read_int32(false).unwrap_err();
    assert!(matches!(err, ReaderError::UnexpectedEof { needed: 4, read: 2 }));
}
