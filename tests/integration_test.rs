//! End-to-end tests: generated archives are validated with a conformant
//! ZIP reader and against known byte layouts.

use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zipstream::{ZipEntry, ZipStream, ZipStreamError};

fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

/// Three-entry archive with fixed timestamps: an ASCII file, a directory
/// marker and a non-ASCII file with a comment.
fn fixture_stream() -> ZipStream {
    ZipStream::new(vec![
        ZipEntry::file("file.txt", || Ok(Cursor::new(b"test".to_vec())))
            .with_size(4)
            .with_modified(dt(2008, 11, 10, 17, 53, 59)),
        ZipEntry::directory("dir/").with_modified(dt(2011, 4, 16, 6, 24, 31)),
        ZipEntry::file("dir/ČŠŽ", || Ok(Cursor::new(b"BBB".to_vec())))
            .with_size(3)
            .with_modified(dt(2011, 4, 16, 6, 24, 31))
            .with_comment(&b"lorem ipsum"[..]),
    ])
    .with_comment(&b"zip comment"[..])
}

fn collect(stream: &ZipStream) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in stream.generate().unwrap() {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

#[test]
fn generated_archive_reads_back() {
    let stream = fixture_stream();
    let data = collect(&stream);

    let mut archive = ZipArchive::new(Cursor::new(&data)).unwrap();
    assert_eq!(archive.len(), 3);
    assert_eq!(archive.comment(), b"zip comment");

    {
        let mut file = archive.by_index(0).unwrap();
        assert_eq!(file.name(), "file.txt");
        assert_eq!(file.size(), 4);
        assert_eq!(file.crc32(), 3_632_233_996);
        let mut body = Vec::new();
        file.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"test");
    }

    {
        let dir = archive.by_index(1).unwrap();
        assert_eq!(dir.name(), "dir/");
        assert_eq!(dir.size(), 0);
        assert!(dir.is_dir());
        assert_eq!(dir.crc32(), 0);
    }

    {
        let mut file = archive.by_index(2).unwrap();
        assert_eq!(file.name(), "dir/ČŠŽ");
        assert_eq!(file.crc32(), 3_603_074_439);
        assert_eq!(file.comment(), "lorem ipsum");
        let mut body = Vec::new();
        file.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"BBB");
    }
}

#[test]
fn total_size_matches_streamed_length() {
    let stream = fixture_stream();
    let size = stream.total_size().unwrap();
    let data = collect(&stream);
    assert_eq!(size, data.len() as u64);
}

#[test]
fn known_byte_layout() {
    let data = collect(&fixture_stream());

    // Local headers: 30-byte header + name + 9-byte timestamp extra, then
    // content and a 16-byte data descriptor per entry.
    assert_eq!(&data[0..4], b"PK\x03\x04");
    assert_eq!(&data[67..71], b"PK\x03\x04"); // "dir/"
    assert_eq!(&data[126..130], b"PK\x03\x04"); // "dir/ČŠŽ"

    // Extended timestamp extra of the first entry: 2008-11-10 17:53:59 UTC
    assert_eq!(
        &data[38..47],
        &[0x55, 0x54, 0x05, 0x00, 0x01, 0x37, 0x75, 0x18, 0x49]
    );

    // Central directory starts after the third entry's descriptor
    assert_eq!(&data[194..198], b"PK\x01\x02");
    // End record follows the 198-byte central directory
    assert_eq!(&data[392..396], b"PK\x05\x06");
    // 22-byte end record plus the 11-byte archive comment
    assert_eq!(data.len(), 425);
}

#[test]
fn empty_archive_is_just_an_end_record() {
    let stream = ZipStream::new(Vec::new());
    let data = collect(&stream);

    assert_eq!(data.len(), 22);
    assert_eq!(stream.total_size().unwrap(), 22);

    let archive = ZipArchive::new(Cursor::new(&data)).unwrap();
    assert_eq!(archive.len(), 0);
}

#[test]
fn crc_reflects_content() {
    let crc_of = |body: &'static [u8]| {
        let stream = ZipStream::new(vec![ZipEntry::file("f", move || {
            Ok(Cursor::new(body.to_vec()))
        })]);
        let data = collect(&stream);
        let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
        let crc = archive.by_index(0).unwrap().crc32();
        crc
    };

    // A single flipped byte must change the recorded CRC
    assert_ne!(crc_of(b"test"), crc_of(b"tesu"));
}

#[test]
fn size_only_zip64_entry() {
    // A declared 5 GiB entry forces the 64-bit descriptor, a zip64 extra
    // field and the zip64 end records; the total is exactly content + 260
    // bytes of framing.
    let five_gib = 5 * 1024 * 1024 * 1024u64;
    let stream = ZipStream::new(vec![ZipEntry::file("file.txt", || {
        Ok(Cursor::new(Vec::new()))
    })
    .with_size(five_gib)
    .with_modified(dt(2008, 11, 10, 17, 53, 59))]);

    assert_eq!(stream.total_size().unwrap(), five_gib + 260);
}

#[test]
fn entry_count_threshold_triggers_zip64_end_records() {
    let entries: Vec<ZipEntry> = (0..65_535)
        .map(|i| ZipEntry::directory(format!("e{i:05}")).with_modified(dt(2020, 1, 1, 0, 0, 0)))
        .collect();
    let stream = ZipStream::new(entries);
    let data = collect(&stream);

    // Classic end record closes the archive with sentinel counts
    let eocd = data.len() - 22;
    assert_eq!(&data[eocd..eocd + 4], b"PK\x05\x06");
    assert_eq!(&data[eocd + 8..eocd + 10], &[0xFF, 0xFF]);
    assert_eq!(&data[eocd + 10..eocd + 12], &[0xFF, 0xFF]);

    // Preceded by the zip64 locator and the zip64 end record with the
    // true 64-bit entry count
    let locator = eocd - 20;
    assert_eq!(&data[locator..locator + 4], b"PK\x06\x07");
    let eocd64 = locator - 56;
    assert_eq!(&data[eocd64..eocd64 + 4], b"PK\x06\x06");
    assert_eq!(
        &data[eocd64 + 24..eocd64 + 32],
        &65_535u64.to_le_bytes()
    );

    assert_eq!(stream.total_size().unwrap(), data.len() as u64);
}

#[test]
fn size_required_for_content_entries() {
    let stream = ZipStream::new(vec![ZipEntry::file("file.txt", || {
        Ok(Cursor::new(b"test".to_vec()))
    })]);

    match stream.total_size() {
        Err(ZipStreamError::SizeRequired { name }) => assert_eq!(name, "file.txt"),
        other => panic!("expected SizeRequired, got {other:?}"),
    }
}

#[test]
fn oversized_name_fails_at_production_time() {
    let long_name = "a".repeat(100_000);
    let stream = ZipStream::new(vec![ZipEntry::file(long_name, || {
        Ok(Cursor::new(b"test".to_vec()))
    })]);

    // Building the iterator succeeds; the error surfaces when the pass
    // reaches the entry.
    let mut chunks = stream.generate().unwrap();
    match chunks.next() {
        Some(Err(ZipStreamError::FileNameTooLong { length })) => assert_eq!(length, 100_000),
        other => panic!("expected FileNameTooLong, got {:?}", other.map(|r| r.map(|c| c.len()))),
    }
}

#[test]
fn second_generate_fails_while_in_progress() {
    let stream = ZipStream::new(vec![ZipEntry::file("file.txt", || {
        Ok(Cursor::new(b"test".to_vec()))
    })]);

    let mut first = stream.generate().unwrap();
    first.next().unwrap().unwrap();

    assert!(matches!(
        stream.generate(),
        Err(ZipStreamError::GenerationInProgress)
    ));
}

#[test]
fn total_size_fails_while_generating() {
    let stream = ZipStream::new(vec![ZipEntry::file("file.txt", || {
        Ok(Cursor::new(b"test".to_vec()))
    })
    .with_size(4)]);

    let mut chunks = stream.generate().unwrap();
    chunks.next().unwrap().unwrap();

    assert!(matches!(
        stream.total_size(),
        Err(ZipStreamError::GenerationInProgress)
    ));

    // Once the pass is released, size calculation works again
    drop(chunks);
    stream.total_size().unwrap();
}

#[test]
fn streams_to_a_file_on_disk() {
    use std::io::Write;

    let stream = fixture_stream();
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    for chunk in stream.generate().unwrap() {
        temp.write_all(&chunk.unwrap()).unwrap();
    }
    temp.flush().unwrap();

    let file = std::fs::File::open(temp.path()).unwrap();
    let mut archive = ZipArchive::new(file).unwrap();
    assert_eq!(archive.len(), 3);
    let mut body = Vec::new();
    archive.by_index(0).unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"test");
}

#[test]
fn pre_epoch_timestamp_clamps_instead_of_wrapping() {
    let stream = ZipStream::new(vec![
        ZipEntry::directory("old.txt").with_modified(dt(1969, 12, 31, 23, 59, 58)),
    ]);
    let data = collect(&stream);

    // DOS fields in the local header: 1980-01-01 00:00:00
    assert_eq!(&data[10..12], &0u16.to_le_bytes()); // time
    assert_eq!(&data[12..14], &(1u16 << 5 | 1).to_le_bytes()); // date
    // Unix mtime in the extended timestamp extra clamps to 0
    assert_eq!(&data[42..46], &0u32.to_le_bytes());

    ZipArchive::new(Cursor::new(data)).unwrap();
}

#[test]
fn default_timestamp_still_produces_valid_archive() {
    let stream = ZipStream::new(vec![ZipEntry::file("now.txt", || {
        Ok(Cursor::new(b"x".to_vec()))
    })]);
    let data = collect(&stream);

    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut body = Vec::new();
    archive.by_index(0).unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, b"x");
}

#[test]
fn content_streams_in_read_sized_chunks() {
    // 10 KiB of content arrives as multiple chunks, concatenating to the
    // original bytes.
    let body: Vec<u8> = (0..10_240u32).map(|i| (i % 251) as u8).collect();
    let expected = body.clone();
    let stream = ZipStream::new(vec![ZipEntry::file("blob.bin", move || {
        Ok(Cursor::new(body.clone()))
    })]);

    let mut content_chunks = 0;
    let mut data = Vec::new();
    for chunk in stream.generate().unwrap() {
        let chunk = chunk.unwrap();
        if chunk.len() > 46 {
            content_chunks += 1;
        }
        data.extend_from_slice(&chunk);
    }
    assert!(content_chunks >= 3, "content was not streamed in chunks");

    let mut archive = ZipArchive::new(Cursor::new(data)).unwrap();
    let mut body = Vec::new();
    archive.by_index(0).unwrap().read_to_end(&mut body).unwrap();
    assert_eq!(body, expected);
}
