//! Byte-level cursor and output buffer shared by the binary codec.
use crate::error::{buffer_exhausted, Result};

/// In-memory reader over a borrowed source buffer.
///
/// All reads are bounds-checked; exhaustion surfaces as
/// [`Error::BufferExhausted`](crate::Error::BufferExhausted) with the
/// requested length.
pub struct Reader<'a> {
    cursor: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { cursor: bytes }
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek(&self) -> Result<u8> {
        self.cursor.first().copied().ok_or_else(|| buffer_exhausted(1))
    }

    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek()?;
        self.cursor = &self.cursor[1..];
        Ok(byte)
    }

    /// Read exactly `N` bytes into an array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let Some((head, rest)) = self.cursor.split_at_checked(N) else {
            return Err(buffer_exhausted(N));
        };
        self.cursor = rest;
        // split_at_checked guarantees `head.len() == N`.
        let mut out = [0u8; N];
        out.copy_from_slice(head);
        Ok(out)
    }

    /// Read exactly `len` bytes as a borrowed slice.
    #[inline]
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let Some((head, rest)) = self.cursor.split_at_checked(len) else {
            return Err(buffer_exhausted(len));
        };
        self.cursor = rest;
        Ok(head)
    }

    /// Advance `amt` bytes and discard them.
    #[inline]
    pub fn consume(&mut self, amt: usize) -> Result<()> {
        self.read_slice(amt).map(drop)
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.cursor.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.is_empty()
    }
}

/// Output sink for encoding.
///
/// Either appends to a growable `Vec<u8>` (capacity doubles, or grows
/// exactly to fit an oversized single write, per `Vec`'s reserve policy) or
/// fills a caller-supplied fixed slice, which reports
/// [`Error::BufferExhausted`](crate::Error::BufferExhausted) instead of
/// growing.
///
/// Positions returned by [`WriteBuf::reserve_count`] stay valid across
/// growth, so sequence counts that are unknown until iteration completes
/// can be patched in after the fact.
pub enum WriteBuf<'a> {
    Growable { vec: &'a mut Vec<u8>, start: usize },
    Fixed { buf: &'a mut [u8], len: usize },
}

impl<'a> WriteBuf<'a> {
    /// Append to `vec`, leaving any existing content in place.
    pub fn growable(vec: &'a mut Vec<u8>) -> Self {
        let start = vec.len();
        Self::Growable { vec, start }
    }

    /// Fill `buf` from the front; never grows.
    pub fn fixed(buf: &'a mut [u8]) -> Self {
        Self::Fixed { buf, len: 0 }
    }

    /// Number of bytes written through this sink so far.
    #[inline]
    pub fn written(&self) -> usize {
        match self {
            Self::Growable { vec, start } => vec.len() - start,
            Self::Fixed { len, .. } => *len,
        }
    }

    #[inline]
    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        match self {
            Self::Growable { vec, .. } => {
                vec.extend_from_slice(src);
                Ok(())
            }
            Self::Fixed { buf, len } => {
                let Some(dst) = buf.get_mut(*len..*len + src.len()) else {
                    return Err(buffer_exhausted(src.len()));
                };
                dst.copy_from_slice(src);
                *len += src.len();
                Ok(())
            }
        }
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Write a 4-byte placeholder for a count that is not yet known and
    /// return the position to patch once it is.
    #[inline]
    pub fn reserve_count(&mut self) -> Result<usize> {
        let pos = self.written();
        self.write(&[0u8; 4])?;
        Ok(pos)
    }

    /// Patch a previously reserved count. `pos` must come from
    /// [`WriteBuf::reserve_count`] on this sink.
    #[inline]
    pub fn patch_count(&mut self, pos: usize, count: u32) {
        let bytes = count.to_le_bytes();
        match self {
            Self::Growable { vec, start } => {
                vec[*start + pos..*start + pos + 4].copy_from_slice(&bytes);
            }
            Self::Fixed { buf, .. } => {
                buf[pos..pos + 4].copy_from_slice(&bytes);
            }
        }
    }

    /// Discard everything written through this sink, restoring the
    /// destination to its state at construction.
    pub fn rewind(&mut self) {
        self.truncate_to(0);
    }

    /// Drop bytes written after the given [`WriteBuf::written`] mark.
    pub fn truncate_to(&mut self, written: usize) {
        match self {
            Self::Growable { vec, start } => vec.truncate(*start + written),
            Self::Fixed { len, .. } => *len = written,
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::Error, proptest::prelude::*};

    #[test]
    fn reader_exhaustion_reports_requested_len() {
        let mut rd = Reader::new(&[1, 2]);
        assert_eq!(rd.read_slice(3), Err(Error::BufferExhausted(3)));
        // A failed read consumes nothing.
        assert_eq!(rd.remaining(), 2);
        assert_eq!(rd.read_array::<2>().unwrap(), [1, 2]);
        assert!(rd.is_empty());
    }

    #[test]
    fn fixed_buf_errors_instead_of_growing() {
        let mut storage = [0u8; 4];
        let mut out = WriteBuf::fixed(&mut storage);
        out.write(&[1, 2, 3]).unwrap();
        assert_eq!(out.write(&[4, 5]), Err(Error::BufferExhausted(2)));
        assert_eq!(out.written(), 3);
    }

    #[test]
    fn growable_appends_after_existing_content() {
        let mut vec = vec![9, 9];
        let mut out = WriteBuf::growable(&mut vec);
        out.write(&[1]).unwrap();
        let pos = out.reserve_count().unwrap();
        out.write(&[7]).unwrap();
        out.patch_count(pos, 0xAABBCCDD);
        assert_eq!(out.written(), 6);
        assert_eq!(vec, [9, 9, 1, 0xDD, 0xCC, 0xBB, 0xAA, 7]);
    }

    #[test]
    fn rewind_restores_initial_state() {
        let mut vec = vec![5];
        let mut out = WriteBuf::growable(&mut vec);
        out.write(&[1, 2, 3]).unwrap();
        out.rewind();
        assert_eq!(out.written(), 0);
        assert_eq!(vec, [5]);
    }

    proptest! {
        #[test]
        fn roundtrip_through_reader(bytes in proptest::collection::vec(any::<u8>(), 0..=64)) {
            let mut vec = Vec::new();
            let mut out = WriteBuf::growable(&mut vec);
            out.write(&bytes).unwrap();
            let mut rd = Reader::new(&vec);
            prop_assert_eq!(rd.read_slice(bytes.len()).unwrap(), &bytes[..]);
            prop_assert!(rd.is_empty());
        }

        #[test]
        fn patch_count_lands_at_reserved_pos(prefix in 0usize..8, count in any::<u32>()) {
            let mut vec = Vec::new();
            let mut out = WriteBuf::growable(&mut vec);
            out.write(&vec![0xFF; prefix]).unwrap();
            let pos = out.reserve_count().unwrap();
            out.write(&[0x55]).unwrap();
            out.patch_count(pos, count);
            let mut rd = Reader::new(&vec);
            rd.consume(prefix).unwrap();
            prop_assert_eq!(u32::from_le_bytes(rd.read_array().unwrap()), count);
        }
    }
}
