//! Little-endian byte codec for snapshot blobs.
//!
//! [`StagingBuffer`] is a capacity-bounded writer: a subsystem declares the
//! full size of its blob with [`StagingBuffer::reserve`] before writing, so a
//! blob either fits completely or nothing is written. [`ByteReader`] is the
//! matching cursor; every short read surfaces as [`CritterError::Truncated`].

use crate::error::{CritterError, Result};

/// Longest string (in bytes) a snapshot stores; longer strings are cut.
pub const MAX_STRING_LEN: usize = 19;

/// Encoded length of a u8-prefixed string.
#[must_use]
pub fn str_len(s: &str) -> usize {
    1 + clip(s).len()
}

/// Cut `s` to at most [`MAX_STRING_LEN`] bytes on a char boundary.
fn clip(s: &str) -> &str {
    if s.len() <= MAX_STRING_LEN {
        return s;
    }
    let mut end = MAX_STRING_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Fixed-capacity staging area shared by every subsystem encoder.
#[derive(Debug)]
pub struct StagingBuffer {
    bytes: Vec<u8>,
    capacity: usize,
}

impl StagingBuffer {
    /// Create an empty buffer that will never grow past `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.bytes.len()
    }

    /// Check that a blob of `len` bytes fits.
    ///
    /// # Errors
    /// Returns [`CritterError::BufferTooSmall`] without touching the buffer.
    pub fn reserve(&mut self, subsystem: &'static str, len: usize) -> Result<()> {
        if len > self.remaining() {
            return Err(CritterError::BufferTooSmall {
                subsystem,
                required: len,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Append a byte.
    pub fn put_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    /// Append a little-endian u32.
    pub fn put_u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a little-endian f32.
    pub fn put_f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    /// Append a length as a u32.
    pub fn put_len(&mut self, len: usize) {
        self.put_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }

    /// Append a u8-length-prefixed string, cut to [`MAX_STRING_LEN`] bytes.
    #[allow(clippy::cast_possible_truncation)]
    pub fn put_str(&mut self, s: &str) {
        let s = clip(s);
        self.put_u8(s.len() as u8);
        self.bytes.extend_from_slice(s.as_bytes());
    }

    /// The encoded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the buffer, returning the encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Little-endian cursor over persisted bytes.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    subsystem: &'static str,
}

impl<'a> ByteReader<'a> {
    /// Start reading `data`, attributing errors to `subsystem`.
    #[must_use]
    pub fn new(data: &'a [u8], subsystem: &'static str) -> Self {
        Self {
            data,
            pos: 0,
            subsystem,
        }
    }

    /// Re-label errors for the next subsystem sharing this cursor.
    pub fn enter(&mut self, subsystem: &'static str) {
        self.subsystem = subsystem;
    }

    /// Subsystem currently being decoded.
    #[must_use]
    pub fn subsystem(&self) -> &'static str {
        self.subsystem
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(CritterError::Truncated {
                subsystem: self.subsystem,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a byte.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] on a short read.
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    /// Read a little-endian u32.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] on a short read.
    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a little-endian f32.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] on a short read.
    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    /// Read a u8-length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] if the length overruns the data,
    /// [`CritterError::Malformed`] if the bytes are not UTF-8.
    pub fn string(&mut self) -> Result<String> {
        let len = usize::from(self.u8()?);
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| self.malformed(format!("invalid UTF-8: {e}")))
    }

    /// Read a u32 element count and check that at least `min_item_len` bytes
    /// per element remain, so a corrupt count cannot trigger a huge allocation.
    ///
    /// # Errors
    /// [`CritterError::Truncated`] if the count cannot possibly be satisfied.
    pub fn count(&mut self, min_item_len: usize) -> Result<usize> {
        let count = self.u32()? as usize;
        let needed = count.saturating_mul(min_item_len);
        if needed > self.remaining() {
            return Err(CritterError::Truncated {
                subsystem: self.subsystem,
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(count)
    }

    /// Build a [`CritterError::Malformed`] for the current subsystem.
    #[must_use]
    pub fn malformed(&self, reason: impl Into<String>) -> CritterError {
        CritterError::Malformed {
            subsystem: self.subsystem,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_refuses_without_writing() {
        let mut buf = StagingBuffer::with_capacity(6);
        buf.put_u32(1);
        let err = buf.reserve("test", 4).expect_err("too small");
        assert!(matches!(
            err,
            CritterError::BufferTooSmall { required: 4, available: 2, .. }
        ));
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn values_are_little_endian() {
        let mut buf = StagingBuffer::with_capacity(16);
        buf.put_u32(0x0102_0304);
        buf.put_str("ab");
        assert_eq!(buf.as_bytes(), &[4, 3, 2, 1, 2, b'a', b'b']);
    }

    #[test]
    fn long_strings_are_clipped() {
        let mut buf = StagingBuffer::with_capacity(64);
        buf.put_str("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(buf.len(), 1 + MAX_STRING_LEN);
        assert_eq!(str_len("abcdefghijklmnopqrstuvwxyz"), 1 + MAX_STRING_LEN);
        let mut r = ByteReader::new(buf.as_bytes(), "test");
        assert_eq!(r.string().expect("string"), "abcdefghijklmnopqrs");
    }

    #[test]
    fn short_read_is_truncated() {
        let mut r = ByteReader::new(&[1, 2, 3], "test");
        let err = r.u32().expect_err("short");
        assert!(matches!(err, CritterError::Truncated { needed: 4, remaining: 3, .. }));
    }

    #[test]
    fn string_length_overrun_is_truncated() {
        let mut r = ByteReader::new(&[10, b'a', b'b'], "test");
        assert!(matches!(r.string(), Err(CritterError::Truncated { .. })));
    }

    #[test]
    fn absurd_count_rejected_before_allocation() {
        let mut r = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0x7F, 0], "test");
        assert!(matches!(r.count(8), Err(CritterError::Truncated { .. })));
    }
}
