//! Input types describing archive members

use chrono::NaiveDateTime;
use std::fmt;
use std::io::{self, Read};

/// Boxed content reader produced by a [`ZipEntry`] content factory
pub type ContentReader = Box<dyn Read + Send>;

/// Zero-argument factory opening an entry's content for one streaming pass
///
/// The factory is invoked right before the entry's bytes are streamed and
/// the returned reader is dropped as soon as the entry is finished, on
/// every exit path including read errors.
pub type ContentFn = Box<dyn Fn() -> io::Result<ContentReader> + Send + Sync>;

/// One logical member of the archive
///
/// Entries are immutable once built and are consumed in list order. A
/// directory marker is an entry without content whose name ends with `/`.
///
/// # Examples
///
/// ```
/// use zipstream::ZipEntry;
/// use std::io::Cursor;
///
/// let file = ZipEntry::file("hello.txt", || Ok(Cursor::new(b"hello".to_vec())))
///     .with_size(5);
/// let dir = ZipEntry::directory("docs/");
/// ```
pub struct ZipEntry {
    /// Path of the entry inside the archive
    pub name: String,
    /// Declared content size; required by size-only mode when content is set
    pub size: Option<u64>,
    /// Content factory; `None` marks a directory or an empty entry
    pub content: Option<ContentFn>,
    /// Modification timestamp; `None` means "now" at encode time
    pub modified: Option<NaiveDateTime>,
    /// Raw-byte comment attached to the central directory record
    pub comment: Option<Vec<u8>>,
}

impl ZipEntry {
    /// Create a file entry with a content factory
    pub fn file<F, R>(name: impl Into<String>, open: F) -> Self
    where
        F: Fn() -> io::Result<R> + Send + Sync + 'static,
        R: Read + Send + 'static,
    {
        ZipEntry {
            name: name.into(),
            size: None,
            content: Some(Box::new(move || {
                open().map(|r| Box::new(r) as ContentReader)
            })),
            modified: None,
            comment: None,
        }
    }

    /// Create an entry without content (directory marker or empty file)
    pub fn directory(name: impl Into<String>) -> Self {
        ZipEntry {
            name: name.into(),
            size: None,
            content: None,
            modified: None,
            comment: None,
        }
    }

    /// Declare the content size, enabling size-only calculation
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the modification timestamp recorded in the archive
    pub fn with_modified(mut self, modified: NaiveDateTime) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Attach a raw-byte comment to this entry
    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

impl fmt::Debug for ZipEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipEntry")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("content", &self.content.as_ref().map(|_| "<fn>"))
            .field("modified", &self.modified)
            .field("comment", &self.comment)
            .finish()
    }
}
