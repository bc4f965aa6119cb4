//! # zipstream: Streaming ZIP Archive Encoder
//!
//! `zipstream` generates ZIP archives on-the-fly from lazily-opened content
//! sources, producing the byte stream chunk by chunk without buffering the
//! archive, seeking backward, or touching the filesystem. It can also
//! compute the exact archive size before reading a single content byte, so
//! an HTTP handler can send a `Content-Length` ahead of the real pass.
//!
//! ## Features
//!
//! - **Streaming output**: pull-based chunk iterator, constant memory
//! - **Up-front size**: exact total from declared entry sizes alone
//! - **Zip64**: 64-bit records kick in automatically past the 4 GiB /
//!   65535-entry thresholds
//! - **Lazy content**: sources are opened right before use and released
//!   right after, on every exit path
//! - **Unicode names**: ASCII stays ASCII, anything else is UTF-8 with the
//!   Unicode flag bit set
//!
//! Entries are always stored uncompressed; sizes and CRCs travel in
//! trailing data descriptors since they are unknown when headers are
//! written.
//!
//! ## Quick Start
//!
//! ```
//! use zipstream::{ZipEntry, ZipStream};
//! use std::io::Cursor;
//!
//! let stream = ZipStream::new(vec![
//!     ZipEntry::file("report.txt", || Ok(Cursor::new(b"summary".to_vec())))
//!         .with_size(7),
//!     ZipEntry::directory("assets/"),
//! ])
//! .with_comment(&b"nightly export"[..]);
//!
//! println!("archive will be {} bytes", stream.total_size()?);
//!
//! let mut out = Vec::new();
//! for chunk in stream.generate()? {
//!     out.extend_from_slice(&chunk?);
//! }
//! # Ok::<(), zipstream::ZipStreamError>(())
//! ```

pub mod error;
pub mod records;
pub mod stream;
pub mod types;

pub use error::{Result, ZipStreamError};
pub use stream::{ZipChunks, ZipStream};
pub use types::{ContentFn, ContentReader, ZipEntry};
