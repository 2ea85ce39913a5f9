//! Module `chunked`
//!
//! Offset-tracked read and write loops over a backend file handle. A single
//! backend call may move fewer bytes than asked for; these loops keep calling
//! until the whole extent has moved or the backend reports a failure.

use log::{error, trace};

use crate::error::{BackendError, BackendResult, codes};
use crate::storage::backend::FileHandle;

/// Largest extent moved by one load or save.
pub const MAX_TRANSFER_SIZE: u64 = i32::MAX as u64;

/// Writes all of `data` starting at offset zero.
///
/// Returns the number of bytes written, which always equals `data.len()` on
/// success. A call that accepts zero bytes is a terminal error.
pub fn write_chunked(file: &mut dyn FileHandle, data: &[u8]) -> BackendResult<u64> {
    let total = data.len();
    let mut offset = 0usize;

    while offset < total {
        let remaining = &data[offset..];
        let written = file.write_at(offset as u64, remaining)?;

        if written == 0 {
            error!("Write stalled at offset {offset} of {total} bytes");
            return Err(BackendError::new(codes::SHORT_WRITE));
        }
        if written > remaining.len() {
            error!(
                "Backend reported {written} bytes written with only {} remaining",
                remaining.len()
            );
            return Err(BackendError::new(codes::FAILED));
        }

        offset += written;
        trace!("Wrote chunk of {written} bytes ({offset}/{total})");
    }

    Ok(offset as u64)
}

/// Reads up to `size` bytes starting at offset zero.
///
/// The buffer is allocated once at `size` bytes. A zero-byte read ends the
/// loop early and the buffer is cut to what was actually read.
pub fn read_chunked(file: &mut dyn FileHandle, size: u64) -> BackendResult<Vec<u8>> {
    let total = usize::try_from(size).map_err(|_| BackendError::new(codes::TOO_BIG))?;
    let mut buffer = vec![0u8; total];
    let mut offset = 0usize;

    while offset < total {
        let read = file.read_at(offset as u64, &mut buffer[offset..])?;
        if read == 0 {
            trace!("Source exhausted at {offset} of {total} bytes");
            buffer.truncate(offset);
            break;
        }
        if read > total - offset {
            error!(
                "Backend reported {read} bytes read with only {} remaining",
                total - offset
            );
            return Err(BackendError::new(codes::FAILED));
        }

        offset += read;
        trace!("Read chunk of {read} bytes ({offset}/{total})");
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// File handle that follows a script of per-call results.
    struct ScriptedFile {
        contents: Vec<u8>,
        script: Vec<BackendResult<usize>>,
        calls: Vec<(u64, usize)>,
    }

    impl ScriptedFile {
        fn new(contents: &[u8], script: Vec<BackendResult<usize>>) -> Self {
            Self {
                contents: contents.to_vec(),
                script,
                calls: Vec::new(),
            }
        }

        fn next(&mut self, offset: u64, requested: usize) -> BackendResult<usize> {
            self.calls.push((offset, requested));
            if self.script.is_empty() {
                Ok(requested)
            } else {
                self.script.remove(0).map(|n| n.min(requested))
            }
        }
    }

    impl FileHandle for ScriptedFile {
        fn size(&mut self) -> BackendResult<u64> {
            Ok(self.contents.len() as u64)
        }

        fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> BackendResult<usize> {
            let start = offset as usize;
            let available = self.contents.len().saturating_sub(start);
            let n = self.next(offset, buf.len())?.min(available);
            buf[..n].copy_from_slice(&self.contents[start..start + n]);
            Ok(n)
        }

        fn write_at(&mut self, offset: u64, data: &[u8]) -> BackendResult<usize> {
            let n = self.next(offset, data.len())?;
            let start = offset as usize;
            if self.contents.len() < start + n {
                self.contents.resize(start + n, 0);
            }
            self.contents[start..start + n].copy_from_slice(&data[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> BackendResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_partial_writes_advance_offset() {
        let mut file = ScriptedFile::new(b"", vec![Ok(2), Ok(1), Ok(4)]);
        let written = write_chunked(&mut file, b"abcdefg").unwrap();

        assert_eq!(written, 7);
        assert_eq!(file.contents, b"abcdefg");
        assert_eq!(file.calls, vec![(0, 7), (2, 5), (3, 4)]);
    }

    #[test]
    fn test_zero_write_is_terminal() {
        let mut file = ScriptedFile::new(b"", vec![Ok(3), Ok(0)]);
        let err = write_chunked(&mut file, b"abcdef").unwrap_err();

        assert_eq!(err.code, codes::SHORT_WRITE);
        assert_eq!(file.calls.len(), 2);
    }

    #[test]
    fn test_write_error_is_terminal() {
        let mut file = ScriptedFile::new(b"", vec![Err(BackendError::new(codes::NO_SPACE))]);
        let err = write_chunked(&mut file, b"abc").unwrap_err();
        assert_eq!(err.code, codes::NO_SPACE);
    }

    #[test]
    fn test_empty_write_issues_no_call() {
        let mut file = ScriptedFile::new(b"", vec![]);
        assert_eq!(write_chunked(&mut file, b"").unwrap(), 0);
        assert!(file.calls.is_empty());
    }

    #[test]
    fn test_partial_reads_fill_buffer() {
        let mut file = ScriptedFile::new(b"0123456789", vec![Ok(4), Ok(1), Ok(3)]);
        let data = read_chunked(&mut file, 10).unwrap();

        assert_eq!(data, b"0123456789");
        assert_eq!(file.calls, vec![(0, 10), (4, 6), (5, 5), (8, 2)]);
    }

    #[test]
    fn test_exhausted_read_truncates() {
        let mut file = ScriptedFile::new(b"abc", vec![]);
        let data = read_chunked(&mut file, 8).unwrap();
        assert_eq!(data, b"abc");
    }

    #[test]
    fn test_read_error_is_terminal() {
        let mut file = ScriptedFile::new(b"abcdef", vec![Ok(2), Err(BackendError::new(codes::FAILED))]);
        assert_eq!(read_chunked(&mut file, 6).unwrap_err().code, codes::FAILED);
    }
}
