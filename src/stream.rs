//! Binary stream buffer
//!
//! Length-prefixed little-endian record format used for flash persistence.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────┐
//! │ len: u16 LE  │ fields in write order (len bytes)     │
//! └──────────────┴──────────────────────────────────────┘
//! ```
//!
//! [`StreamWriter`] stages writes in a 128-byte area and appends them to the
//! backing buffer whenever the next write would not fit. Staged bytes only
//! become part of the record on [`StreamWriter::flush`]; dropping a writer
//! without flushing loses them. [`StreamWriter::finish`] flushes and hands
//! the record over.
//!
//! [`StreamReader`] wraps a finished record and reads fields back in the
//! same order, starting after the prefix.

use heapless::Vec;

use crate::config::{RECORD_CAPACITY, STREAM_STAGING_SIZE};
use crate::error::StreamError;

/// Size of the length prefix
pub const PREFIX_LEN: usize = 2;

/// Write-mode stream
pub struct StreamWriter<const N: usize = RECORD_CAPACITY> {
    staging: [u8; STREAM_STAGING_SIZE],
    staged: usize,
    data: Vec<u8, N>,
}

impl<const N: usize> StreamWriter<N> {
    /// Create an empty stream with the prefix reserved
    #[must_use]
    pub fn new() -> Self {
        let mut data = Vec::new();
        // N smaller than the prefix leaves `data` empty; the first flush
        // then reports Capacity.
        let _ = data.extend_from_slice(&[0; PREFIX_LEN]);
        Self {
            staging: [0; STREAM_STAGING_SIZE],
            staged: 0,
            data,
        }
    }

    /// Append a byte
    pub fn write_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.stage(&[value])
    }

    /// Append a little-endian u16
    pub fn write_u16(&mut self, value: u16) -> Result<(), StreamError> {
        self.stage(&value.to_le_bytes())
    }

    /// Append a little-endian u32
    pub fn write_u32(&mut self, value: u32) -> Result<(), StreamError> {
        self.stage(&value.to_le_bytes())
    }

    /// Append a byte run no larger than the staging area
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        if bytes.len() > STREAM_STAGING_SIZE {
            return Err(StreamError::Oversize {
                len: bytes.len(),
                max: STREAM_STAGING_SIZE,
            });
        }
        self.stage(bytes)
    }

    fn stage(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        if self.staged + bytes.len() > STREAM_STAGING_SIZE {
            self.flush()?;
        }
        self.staging[self.staged..self.staged + bytes.len()].copy_from_slice(bytes);
        self.staged += bytes.len();
        Ok(())
    }

    /// Move staged bytes into the record and update the length prefix
    pub fn flush(&mut self) -> Result<(), StreamError> {
        if self.data.len() < PREFIX_LEN {
            return Err(StreamError::Capacity);
        }
        self.data
            .extend_from_slice(&self.staging[..self.staged])
            .map_err(|()| StreamError::Capacity)?;
        self.staged = 0;

        let payload = u16::try_from(self.data.len() - PREFIX_LEN)
            .map_err(|_| StreamError::Capacity)?;
        self.data[..PREFIX_LEN].copy_from_slice(&payload.to_le_bytes());
        Ok(())
    }

    /// Flush and return the finished record
    pub fn finish(mut self) -> Result<Vec<u8, N>, StreamError> {
        self.flush()?;
        Ok(self.data)
    }

    /// Flushed record, prefix included. Staged bytes are not visible here.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload bytes flushed so far
    #[must_use]
    pub fn flushed_len(&self) -> usize {
        self.data.len().saturating_sub(PREFIX_LEN)
    }

    /// Bytes waiting in the staging area
    #[must_use]
    pub const fn staged_len(&self) -> usize {
        self.staged
    }
}

impl<const N: usize> Default for StreamWriter<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-mode stream over a finished record
pub struct StreamReader<'a> {
    data: &'a [u8],
    cursor: usize,
    end: usize,
}

impl<'a> StreamReader<'a> {
    /// Wrap a record. Reads are bounded by the declared length and by the
    /// slice itself.
    pub fn load(data: &'a [u8]) -> Result<Self, StreamError> {
        let prefix = data.get(..PREFIX_LEN).ok_or(StreamError::Underrun)?;
        let declared = usize::from(u16::from_le_bytes([prefix[0], prefix[1]]));
        Ok(Self {
            data,
            cursor: PREFIX_LEN,
            end: (PREFIX_LEN + declared).min(data.len()),
        })
    }

    /// Payload length declared by the prefix
    #[must_use]
    pub fn declared_len(&self) -> usize {
        usize::from(u16::from_le_bytes([self.data[0], self.data[1]]))
    }

    /// Bytes left before the declared end
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.end - self.cursor
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        if len > self.remaining() {
            return Err(StreamError::Underrun);
        }
        let bytes = &self.data[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(bytes)
    }

    /// Read a byte
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian u16
    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian u32
    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Fill `out` from the stream
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), StreamError> {
        out.copy_from_slice(self.take(out.len())?);
        Ok(())
    }
}
