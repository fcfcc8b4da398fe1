//! Compression filter detection and decoding for package archives.
//!
//! This crate wraps several compression libraries behind a unified
//! [`Compression`] enum, providing:
//!
//! - **Format detection** from magic bytes ([`Compression::from_magic_bytes`])
//! - **Sniffing** a raw stream without consuming it ([`Compression::sniff`]),
//!   which detects the filter from the first few bytes and hands back a
//!   decoding reader positioned at the start of the decompressed content
//! - **Streaming** decoders ([`Compression::wrap_reader`])
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`]), mostly useful for building test archives
//!
//! Bzip2 and Gzip are always available. XZ and Zstd are behind (default)
//! feature flags, since those are the filters package archives use today.

mod construct;
pub mod error;
mod ops;
mod peekable;
mod util;

pub use crate::peekable::PeekableReader;

/// A supported compression format.
///
/// Variants gated behind feature flags (`xz`, `zstd`) are only available when
/// the corresponding feature is enabled. Defaults to [`None`](Self::None)
/// (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA compression (.xz)
    #[cfg(feature = "xz")]
    Xz,
    /// Zstd compression (.zst)
    #[cfg(feature = "zstd")]
    Zstd,
}
