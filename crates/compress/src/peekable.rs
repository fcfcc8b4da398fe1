//! Peekable reading for detect-then-decode workflows.
//!
//! Thin convenience wrapper around standard library I/O primitives
//! ([`Read::take`], [`Cursor`], [`Chain`]) so the magic bytes of a stream can
//! be inspected without losing them.

use crate::Compression;
use crate::construct::MAGIC_LEN;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::io::{Chain, Cursor, Read};
use tracing::instrument;

/// A resumable [`Read`]er for peek-decide-stream workflows.
///
/// Read enough data to inspect (e.g. compression magic bytes), then stream the
/// full content onward via [`into_reader`](Self::into_reader), or drop to
/// discard.
pub struct PeekableReader<R> {
    inner: R,
    buffer: Vec<u8>,
}

impl<R: Read> PeekableReader<R> {
    /// Wrap any reader for peeking.
    pub fn new(inner: R) -> Self {
        Self { inner, buffer: Vec::new() }
    }

    /// Read up to `limit` bytes of the content.
    ///
    /// Returns a slice of all buffered data. Successive calls do not accumulate:
    /// - `peek(4)` puts 4 bytes in the buffer, returns 4 bytes
    /// - `peek(8)` puts an additional 4 bytes in the buffer, returns 8 bytes
    /// - `peek(2)` immediately returns 2 bytes (because buffer already has 8)
    pub fn peek(&mut self, limit: usize) -> Result<&[u8]> {
        if self.buffer.len() >= limit {
            return Ok(&self.buffer[..limit]);
        }
        let needed = (limit - self.buffer.len()) as u64;
        (&mut self.inner).take(needed).read_to_end(&mut self.buffer).or_raise(|| ErrorKind::Io)?;
        Ok(&self.buffer[..self.buffer.len().min(limit)])
    }

    /// Convert into a [`Read`]er that replays the buffered head, then
    /// streams the remaining content.
    pub fn into_reader(self) -> Chain<Cursor<Vec<u8>>, R> {
        Cursor::new(self.buffer).chain(self.inner)
    }
}

impl Compression {
    /// Detect the compression filter of a raw stream from its magic bytes and
    /// return a reader yielding the decompressed content from the very start.
    ///
    /// Streams that match no known magic are passed through untouched as
    /// [`Compression::None`]; whether that content is usable is up to the
    /// caller's container parser.
    ///
    /// # Example
    ///
    /// ```
    /// use pacstage_compress::Compression;
    /// use std::io::{Cursor, Read};
    ///
    /// let compressed = Compression::Bzip2.compress(b"pkgname = example").unwrap();
    /// let (format, mut reader) = Compression::sniff(Cursor::new(compressed)).unwrap();
    /// assert_eq!(format, Compression::Bzip2);
    ///
    /// let mut content = String::new();
    /// reader.read_to_string(&mut content).unwrap();
    /// assert_eq!(content, "pkgname = example");
    /// ```
    #[instrument(level = "trace", skip(reader))]
    pub fn sniff<'a, R: Read + 'a>(reader: R) -> Result<(Compression, Box<dyn Read + 'a>)> {
        let mut peekable = PeekableReader::new(reader);
        let format = Compression::from_magic_bytes(peekable.peek(MAGIC_LEN)?);
        tracing::trace!(%format, "detected compression filter");
        Ok((format, format.wrap_reader(peekable.into_reader())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn test_data() -> Vec<u8> {
        b"Hello, world! This is test data for sniffing. \
          It needs to be long enough to test multiple peek() calls."
            .to_vec()
    }

    #[test]
    fn test_multiple_peek_calls() {
        let original = test_data();
        let mut peekable = PeekableReader::new(Cursor::new(original.clone()));
        assert_eq!(peekable.peek(5).unwrap(), b"Hello");
        assert_eq!(peekable.peek(13).unwrap(), b"Hello, world!");
        assert_eq!(peekable.peek(2).unwrap(), b"He");
        let mut output = Vec::new();
        peekable.into_reader().read_to_end(&mut output).unwrap();
        assert_eq!(output, original);
    }

    #[test]
    fn test_peek_larger_than_data() {
        let mut peekable = PeekableReader::new(Cursor::new(b"tiny".to_vec()));
        assert_eq!(peekable.peek(1000).unwrap(), b"tiny");
    }

    #[rstest]
    #[case(Compression::None)]
    #[case(Compression::Gzip)]
    #[case(Compression::Bzip2)]
    #[cfg_attr(feature = "xz", case(Compression::Xz))]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd))]
    fn test_sniff(#[case] format: Compression) {
        let original = test_data();
        let compressed = format.compress(&original).unwrap();
        let (detected, mut reader) = Compression::sniff(Cursor::new(compressed)).unwrap();
        assert_eq!(detected, format);
        let mut output = Vec::new();
        reader.read_to_end(&mut output).unwrap();
        assert_eq!(output, original);
    }

    #[test]
    fn test_sniff_empty_input() {
        let (detected, mut reader) = Compression::sniff(Cursor::new(Vec::new())).unwrap();
        assert_eq!(detected, Compression::None);
        let mut output = Vec::new();
        reader.read_to_end(&mut output).unwrap();
        assert!(output.is_empty());
    }
}
