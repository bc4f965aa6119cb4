//! Streaming ZIP generation with pull-based chunk production
//!
//! [`ZipStream`] drives the whole two-phase archive layout: local headers and
//! streamed content first, then the central directory and the end records.
//! Chunks are produced on demand by a plain iterator, so the archive is never
//! buffered and the output position only moves forward. The same control flow
//! runs in size-only mode to compute the exact archive size before any
//! content is read.

use crate::error::{Result, ZipStreamError};
use crate::records;
use crate::types::{ContentReader, ZipEntry};
use chrono::Local;
use crc32fast::Hasher as Crc32;
use std::cell::Cell;
use std::collections::VecDeque;
use std::io::Read;

/// Read size for content sources
const CHUNK_SIZE: usize = 4096;

/// FAT directory attribute bit for the external attributes field
const EXTERNAL_ATTR_DIR: u32 = 0x10;

/// Pass state of a [`ZipStream`]; at most one pass may be active at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassState {
    Idle,
    Generating,
}

/// Clears the in-progress state when a pass ends on any path
///
/// Released explicitly the moment the pass completes; the drop impl covers
/// abandonment and error paths. A released guard is disarmed so dropping a
/// finished iterator cannot disturb a later pass.
struct PassGuard<'a> {
    state: Option<&'a Cell<PassState>>,
}

impl PassGuard<'_> {
    fn release(&mut self) {
        if let Some(state) = self.state.take() {
            state.set(PassState::Idle);
        }
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Per-entry bookkeeping captured while streaming, replayed for the central
/// directory. Created once per entry and never mutated afterwards.
struct CentralDirectoryRecord {
    name: Vec<u8>,
    extra: Vec<u8>,
    comment: Vec<u8>,
    create_version: u16,
    extract_version: u16,
    flags: u16,
    dos_time: u16,
    dos_date: u16,
    crc: u32,
    size: u64,
    external_attr: u32,
    offset: u64,
    zip64: bool,
}

/// Header-time entry state, completed into a [`CentralDirectoryRecord`] once
/// the final size and CRC are known
struct PendingEntry {
    index: usize,
    name: Vec<u8>,
    extra: Vec<u8>,
    flags: u16,
    dos_time: u16,
    dos_date: u16,
    comment: Vec<u8>,
    offset: u64,
}

/// Streaming ZIP archive encoder
///
/// Holds the ordered entry list and the optional archive comment. Entries
/// are always stored uncompressed with a trailing data descriptor, and zip64
/// structures are emitted exactly when a 32-bit or 16-bit field threshold is
/// crossed.
///
/// # Examples
///
/// ```
/// use zipstream::{ZipEntry, ZipStream};
/// use std::io::Cursor;
///
/// let stream = ZipStream::new(vec![
///     ZipEntry::file("hello.txt", || Ok(Cursor::new(b"hello".to_vec()))).with_size(5),
///     ZipEntry::directory("docs/"),
/// ]);
///
/// // Exact size before reading any content
/// let size = stream.total_size()?;
///
/// let mut archive = Vec::new();
/// for chunk in stream.generate()? {
///     archive.extend_from_slice(&chunk?);
/// }
/// assert_eq!(archive.len() as u64, size);
/// # Ok::<(), zipstream::ZipStreamError>(())
/// ```
pub struct ZipStream {
    entries: Vec<ZipEntry>,
    comment: Option<Vec<u8>>,
    state: Cell<PassState>,
}

impl ZipStream {
    /// Create a stream over an ordered list of entries
    pub fn new(entries: Vec<ZipEntry>) -> Self {
        ZipStream {
            entries,
            comment: None,
            state: Cell::new(PassState::Idle),
        }
    }

    /// Attach a raw-byte archive-level comment
    pub fn with_comment(mut self, comment: impl Into<Vec<u8>>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Start a streaming pass, producing the archive as a chunk iterator
    ///
    /// Fails with [`ZipStreamError::GenerationInProgress`] if another pass
    /// (streaming or size-only) is still active. Dropping the returned
    /// iterator at any point returns the stream to idle.
    pub fn generate(&self) -> Result<ZipChunks<'_>> {
        self.begin(false)
    }

    /// Compute the exact archive size without reading any content
    ///
    /// Drives the identical generation logic in size-only mode: declared
    /// entry sizes stand in for content and content sources are never
    /// opened, so recorded CRCs are not meaningful on this path. Fails with
    /// [`ZipStreamError::SizeRequired`] if an entry with content has no
    /// declared size, and obeys the same mutual exclusion as [`generate`].
    ///
    /// [`generate`]: ZipStream::generate
    pub fn total_size(&self) -> Result<u64> {
        let mut chunks = self.begin(true)?;
        for chunk in &mut chunks {
            chunk?;
        }
        Ok(chunks.pos)
    }

    fn begin(&self, size_only: bool) -> Result<ZipChunks<'_>> {
        if self.state.get() == PassState::Generating {
            return Err(ZipStreamError::GenerationInProgress);
        }
        self.state.set(PassState::Generating);

        Ok(ZipChunks {
            entries: &self.entries,
            comment: self.comment.as_deref(),
            guard: PassGuard {
                state: Some(&self.state),
            },
            size_only,
            pos: 0,
            dir: Vec::with_capacity(self.entries.len()),
            queue: VecDeque::new(),
            phase: Phase::Entry(0),
        })
    }
}

/// Production phase of one generation pass
enum Phase {
    /// About to emit the local header of entry `n`, or the central directory
    /// when all entries are done
    Entry(usize),
    /// Streaming content chunks for the current entry
    Content {
        reader: ContentReader,
        crc: Crc32,
        written: u64,
        pending: PendingEntry,
    },
    /// Replaying accumulated records into the central directory
    CentralDirectory { index: usize, start: u64 },
    Done,
}

/// Chunk iterator for one generation pass, returned by [`ZipStream::generate`]
///
/// Yields the archive bytes in order as `Result<Vec<u8>>` items. Any error
/// aborts the pass; the consumer must discard partial output.
pub struct ZipChunks<'a> {
    entries: &'a [ZipEntry],
    comment: Option<&'a [u8]>,
    guard: PassGuard<'a>,
    size_only: bool,
    /// Running output offset; equals bytes produced so far
    pos: u64,
    dir: Vec<CentralDirectoryRecord>,
    queue: VecDeque<Vec<u8>>,
    phase: Phase,
}

impl Iterator for ZipChunks<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.queue.pop_front() {
                self.pos += chunk.len() as u64;
                return Some(Ok(chunk));
            }

            match self.advance() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

impl ZipChunks<'_> {
    /// Run one production step, refilling the chunk queue
    ///
    /// Only called with an empty queue, so `pos` is exact at every step.
    /// Returns `Ok(false)` when the archive is complete. On error the phase
    /// is already `Done` and any open content reader has been dropped.
    fn advance(&mut self) -> Result<bool> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Entry(index) if index < self.entries.len() => {
                self.begin_entry(index)?;
                Ok(true)
            }
            Phase::Entry(_) => {
                self.phase = Phase::CentralDirectory {
                    index: 0,
                    start: self.pos,
                };
                Ok(true)
            }
            Phase::Content {
                mut reader,
                mut crc,
                mut written,
                pending,
            } => {
                let mut buf = vec![0u8; CHUNK_SIZE];
                let n = reader.read(&mut buf)?;
                if n == 0 {
                    self.finish_entry(pending, written, crc.finalize());
                } else {
                    buf.truncate(n);
                    crc.update(&buf);
                    written += n as u64;
                    self.queue.push_back(buf);
                    self.phase = Phase::Content {
                        reader,
                        crc,
                        written,
                        pending,
                    };
                }
                Ok(true)
            }
            Phase::CentralDirectory { index, start } if index < self.dir.len() => {
                self.emit_directory_record(index);
                self.phase = Phase::CentralDirectory {
                    index: index + 1,
                    start,
                };
                Ok(true)
            }
            Phase::CentralDirectory { start, .. } => {
                self.emit_end_records(start);
                Ok(true)
            }
            Phase::Done => {
                // The last chunk has been consumed; return the stream to
                // idle right away rather than waiting for the iterator to
                // be dropped.
                self.guard.release();
                Ok(false)
            }
        }
    }

    /// Emit the local header for entry `index` and route its content
    fn begin_entry(&mut self, index: usize) -> Result<()> {
        let entries = self.entries;
        let entry = &entries[index];
        let offset = self.pos;

        let modified = entry
            .modified
            .unwrap_or_else(|| Local::now().naive_local());
        let (dos_date, dos_time) = records::dos_datetime(&modified);
        // Unix mtime for the extended timestamp field is 32-bit; clamp
        // instead of wrapping for out-of-range dates
        let mod_unix = modified.and_utc().timestamp().clamp(0, u32::MAX as i64) as u32;

        let (name, flags) = records::encode_filename(&entry.name, records::FLAG_DATA_DESCRIPTOR);
        if name.len() > u16::MAX as usize {
            return Err(ZipStreamError::FileNameTooLong { length: name.len() });
        }

        let extra = records::extended_timestamp_extra(mod_unix);

        let header = records::local_file_header(
            records::VERSION_2_0,
            flags,
            dos_time,
            dos_date,
            name.len() as u16,
            extra.len() as u16,
        );
        self.queue.push_back(header);
        self.queue.push_back(name.clone());
        self.queue.push_back(extra.clone());

        let pending = PendingEntry {
            index,
            name,
            extra,
            flags,
            dos_time,
            dos_date,
            comment: entry.comment.clone().unwrap_or_default(),
            offset,
        };

        match &entry.content {
            None => {
                // Directory marker or explicitly empty entry
                self.finish_entry(pending, 0, 0);
            }
            Some(_) if self.size_only => {
                let size = entry.size.ok_or_else(|| ZipStreamError::SizeRequired {
                    name: entry.name.clone(),
                })?;
                self.pos += size;
                self.finish_entry(pending, size, 0);
            }
            Some(open) => {
                let reader = open()?;
                self.phase = Phase::Content {
                    reader,
                    crc: Crc32::new(),
                    written: 0,
                    pending,
                };
            }
        }

        Ok(())
    }

    /// Emit the data descriptor and append the central directory record
    fn finish_entry(&mut self, pending: PendingEntry, size: u64, crc: u32) {
        let zip64 = size > u32::MAX as u64;

        let descriptor = if zip64 {
            records::data_descriptor64(crc, size)
        } else {
            records::data_descriptor(crc, size as u32)
        };
        self.queue.push_back(descriptor);

        let mut external_attr = 0;
        if size == 0 && pending.name.last() == Some(&b'/') {
            external_attr |= EXTERNAL_ATTR_DIR;
        }

        self.dir.push(CentralDirectoryRecord {
            name: pending.name,
            extra: pending.extra,
            comment: pending.comment,
            create_version: records::VERSION_2_0,
            extract_version: if zip64 {
                records::VERSION_4_5
            } else {
                records::VERSION_2_0
            },
            flags: pending.flags,
            dos_time: pending.dos_time,
            dos_date: pending.dos_date,
            crc,
            size,
            external_attr,
            offset: pending.offset,
            zip64,
        });

        self.phase = Phase::Entry(pending.index + 1);
    }

    /// Emit one central directory record, re-deriving its extra field
    fn emit_directory_record(&mut self, index: usize) {
        let rec = &self.dir[index];

        let mut extra = rec.extra.clone();
        let size = if rec.zip64 {
            extra.extend_from_slice(&records::zip64_extra(rec.size, rec.offset));
            u32::MAX
        } else {
            rec.size as u32
        };
        let offset = rec.offset.min(u32::MAX as u64) as u32;

        let header = records::central_directory_header(
            rec.create_version,
            rec.extract_version,
            rec.flags,
            rec.dos_time,
            rec.dos_date,
            rec.crc,
            size,
            rec.name.len() as u16,
            extra.len() as u16,
            rec.comment.len() as u16,
            rec.external_attr,
            offset,
        );
        let name = rec.name.clone();
        let comment = rec.comment.clone();

        self.queue.push_back(header);
        self.queue.push_back(name);
        self.queue.push_back(extra);
        if !comment.is_empty() {
            self.queue.push_back(comment);
        }
    }

    /// Emit the end-of-central-directory record(s) and finish the pass
    fn emit_end_records(&mut self, start: u64) {
        let end = self.pos;
        let count = self.dir.len() as u64;
        let dir_size = end - start;
        let dir_offset = start;

        let (count16, size32, offset32) = if count >= u16::MAX as u64
            || dir_size >= u32::MAX as u64
            || dir_offset >= u32::MAX as u64
        {
            self.queue
                .push_back(records::zip64_end_of_central_directory(
                    count, dir_size, dir_offset,
                ));
            self.queue.push_back(records::zip64_locator(end));
            (u16::MAX, u32::MAX, u32::MAX)
        } else {
            (count as u16, dir_size as u32, dir_offset as u32)
        };

        let comment = self.comment.unwrap_or_default();
        self.queue.push_back(records::end_of_central_directory(
            count16,
            size32,
            offset32,
            comment.len() as u16,
        ));
        if !comment.is_empty() {
            self.queue.push_back(comment.to_vec());
        }

        self.phase = Phase::Done;
    }
}
