//! Binary serialization of ZIP file structures
//!
//! Pure little-endian encoders, one per fixed-layout ZIP record. No I/O and
//! no shared state; the orchestrator in [`crate::stream`] is responsible for
//! choosing zip64 variants before a value would overflow its field.

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Local file header signature (`PK\x03\x04`)
pub const LOCAL_FILE_HEADER_SIG: [u8; 4] = *b"PK\x03\x04";
/// Streaming data descriptor signature (`PK\x07\x08`), de-facto standard
/// required by OS X Finder
pub const DATA_DESCRIPTOR_SIG: [u8; 4] = *b"PK\x07\x08";
/// Central directory header signature (`PK\x01\x02`)
pub const CENTRAL_DIR_SIG: [u8; 4] = *b"PK\x01\x02";
/// End of central directory signature (`PK\x05\x06`)
pub const END_OF_CENTRAL_DIR_SIG: [u8; 4] = *b"PK\x05\x06";
/// Zip64 end of central directory signature (`PK\x06\x06`)
pub const ZIP64_END_OF_CENTRAL_DIR_SIG: [u8; 4] = *b"PK\x06\x06";
/// Zip64 end of central directory locator signature (`PK\x06\x07`)
pub const ZIP64_LOCATOR_SIG: [u8; 4] = *b"PK\x06\x07";

/// ZIP version 2.0: default for stored entries
pub const VERSION_2_0: u16 = 20;
/// ZIP version 4.5: reads and writes zip64 archives
pub const VERSION_4_5: u16 = 45;

/// Compression method: stored (no compression)
pub const METHOD_STORED: u16 = 0;

/// General purpose flag bit 3: sizes and CRC follow in a data descriptor
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
/// General purpose flag bit 11: file name is encoded as UTF-8
pub const FLAG_UTF8: u16 = 1 << 11;

/// Zip64 extended information extra field id
const ZIP64_EXTRA_ID: u16 = 0x0001;
/// Zip64 extra field data size: three u64 values
const ZIP64_EXTRA_SIZE: u16 = 24;

/// Extended timestamp extra field id
const EXT_TIME_EXTRA_ID: u16 = 0x5455;
/// Extended timestamp data size: flags byte + u32 mod time
const EXT_TIME_EXTRA_SIZE: u16 = 5;
/// Extended timestamp flags: modification time present
const EXT_TIME_EXTRA_FLAGS: u8 = 1;

/// Encode a file name, choosing ASCII or UTF-8
///
/// ASCII names pass through unchanged; any non-ASCII character forces UTF-8
/// encoding and sets the Unicode flag bit on top of the base flags.
pub fn encode_filename(name: &str, flags: u16) -> (Vec<u8>, u16) {
    if name.is_ascii() {
        (name.as_bytes().to_vec(), flags)
    } else {
        (name.as_bytes().to_vec(), flags | FLAG_UTF8)
    }
}

/// Pack a timestamp into DOS (date, time) fields
///
/// DOS time has 2-second granularity; seconds are truncated, not rounded.
/// Timestamps before the DOS epoch clamp to 1980-01-01 00:00:00, the
/// earliest instant the fields can represent.
pub fn dos_datetime(dt: &NaiveDateTime) -> (u16, u16) {
    if dt.year() < 1980 {
        return (1 << 5 | 1, 0);
    }
    let date = ((dt.year() - 1980) as u16) << 9 | (dt.month() as u16) << 5 | dt.day() as u16;
    let time = (dt.hour() as u16) << 11 | (dt.minute() as u16) << 5 | (dt.second() as u16) / 2;
    (date, time)
}

/// Encode the extended timestamp extra field (id `0x5455`)
///
/// Carries the Unix modification time alongside the coarse DOS fields.
pub fn extended_timestamp_extra(mod_time: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    buf.extend_from_slice(&EXT_TIME_EXTRA_ID.to_le_bytes());
    buf.extend_from_slice(&EXT_TIME_EXTRA_SIZE.to_le_bytes());
    buf.push(EXT_TIME_EXTRA_FLAGS);
    buf.extend_from_slice(&mod_time.to_le_bytes());
    buf
}

/// Encode a local file header (30 bytes, excluding name and extra)
///
/// CRC and sizes are always zero here: the real values are only known after
/// the content has streamed and are carried by the trailing data descriptor.
pub fn local_file_header(
    extract_version: u16,
    flags: u16,
    dos_time: u16,
    dos_date: u16,
    name_len: u16,
    extra_len: u16,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(30);
    buf.extend_from_slice(&LOCAL_FILE_HEADER_SIG);
    buf.extend_from_slice(&extract_version.to_le_bytes());
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&METHOD_STORED.to_le_bytes());
    buf.extend_from_slice(&dos_time.to_le_bytes());
    buf.extend_from_slice(&dos_date.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // crc32, in descriptor
    buf.extend_from_slice(&0u32.to_le_bytes()); // compressed size, in descriptor
    buf.extend_from_slice(&0u32.to_le_bytes()); // uncompressed size, in descriptor
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(&extra_len.to_le_bytes());
    buf
}

/// Encode a streaming data descriptor with 32-bit sizes (16 bytes)
pub fn data_descriptor(crc: u32, size: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.extend_from_slice(&DATA_DESCRIPTOR_SIG);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}

/// Encode a streaming data descriptor with 64-bit sizes (24 bytes)
pub fn data_descriptor64(crc: u32, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(24);
    buf.extend_from_slice(&DATA_DESCRIPTOR_SIG);
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}

/// Encode the zip64 extended information extra field (28 bytes)
///
/// Compressed and uncompressed sizes are equal because entries are stored.
pub fn zip64_extra(size: u64, offset: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(28);
    buf.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
    buf.extend_from_slice(&ZIP64_EXTRA_SIZE.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    buf
}

/// Encode a central directory header (46 bytes, excluding name/extra/comment)
///
/// `size` and `offset` must already be capped to `0xFFFFFFFF` by the caller
/// when the entry carries a zip64 extra field.
#[allow(clippy::too_many_arguments)]
pub fn central_directory_header(
    create_version: u16,
    extract_version: u16,
    flags: u16,
    dos_time: u16,
    dos_date: u16,
    crc: u32,
    size: u32,
    name_len: u16,
    extra_len: u16,
    comment_len: u16,
    external_attr: u32,
    offset: u32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(46);
    buf.extend_from_slice(&CENTRAL_DIR_SIG);
    buf.push(create_version as u8);
    buf.push(0); // create system: MS-DOS
    buf.push(extract_version as u8);
    buf.push(0); // reserved
    buf.extend_from_slice(&flags.to_le_bytes());
    buf.extend_from_slice(&METHOD_STORED.to_le_bytes());
    buf.extend_from_slice(&dos_time.to_le_bytes());
    buf.extend_from_slice(&dos_date.to_le_bytes());
    buf.extend_from_slice(&crc.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes()); // compressed
    buf.extend_from_slice(&size.to_le_bytes()); // uncompressed
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(&extra_len.to_le_bytes());
    buf.extend_from_slice(&comment_len.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // disk number start
    buf.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
    buf.extend_from_slice(&external_attr.to_le_bytes());
    buf.extend_from_slice(&offset.to_le_bytes());
    buf
}

/// Encode the classic end of central directory record (22 bytes, no comment)
///
/// Count, size and offset must be the `0xFFFF`/`0xFFFFFFFF` sentinels when a
/// zip64 end record precedes this one.
pub fn end_of_central_directory(
    entry_count: u16,
    dir_size: u32,
    dir_offset: u32,
    comment_len: u16,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(22);
    buf.extend_from_slice(&END_OF_CENTRAL_DIR_SIG);
    buf.extend_from_slice(&0u16.to_le_bytes()); // disk number
    buf.extend_from_slice(&0u16.to_le_bytes()); // disk with central directory
    buf.extend_from_slice(&entry_count.to_le_bytes()); // entries on this disk
    buf.extend_from_slice(&entry_count.to_le_bytes()); // entries total
    buf.extend_from_slice(&dir_size.to_le_bytes());
    buf.extend_from_slice(&dir_offset.to_le_bytes());
    buf.extend_from_slice(&comment_len.to_le_bytes());
    buf
}

/// Encode the zip64 end of central directory record (56 bytes)
pub fn zip64_end_of_central_directory(entry_count: u64, dir_size: u64, dir_offset: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(56);
    buf.extend_from_slice(&ZIP64_END_OF_CENTRAL_DIR_SIG);
    buf.extend_from_slice(&44u64.to_le_bytes()); // record size, fixed fields only
    buf.extend_from_slice(&VERSION_4_5.to_le_bytes());
    buf.extend_from_slice(&VERSION_4_5.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // disk number
    buf.extend_from_slice(&0u32.to_le_bytes()); // disk with central directory
    buf.extend_from_slice(&entry_count.to_le_bytes()); // entries on this disk
    buf.extend_from_slice(&entry_count.to_le_bytes()); // entries total
    buf.extend_from_slice(&dir_size.to_le_bytes());
    buf.extend_from_slice(&dir_offset.to_le_bytes());
    buf
}

/// Encode the zip64 end of central directory locator (20 bytes)
///
/// `end_offset` is the position where the zip64 end record begins, which is
/// also the end of the central directory.
pub fn zip64_locator(end_offset: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(20);
    buf.extend_from_slice(&ZIP64_LOCATOR_SIG);
    buf.extend_from_slice(&0u32.to_le_bytes()); // disk with the zip64 end record
    buf.extend_from_slice(&end_offset.to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes()); // total number of disks
    buf
}
