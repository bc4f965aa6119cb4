//! Stream a ZIP archive to a file, announcing its size first.
//!
//! Run with: `cargo run --example stream_to_file`

use std::fs::File;
use std::io::{Cursor, Write};
use zipstream::{ZipEntry, ZipStream};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let readme = b"zipstream demo archive\n".to_vec();
    let report = b"everything is fine\n".to_vec();

    let stream = ZipStream::new(vec![
        ZipEntry::file("README.txt", move || Ok(Cursor::new(readme.clone())))
            .with_size(23),
        ZipEntry::directory("reports/"),
        ZipEntry::file("reports/2026-08.txt", move || Ok(Cursor::new(report.clone())))
            .with_size(19)
            .with_comment(&b"monthly status"[..]),
    ])
    .with_comment(&b"generated by the stream_to_file demo"[..]);

    // The exact size is known before any content is opened, the way an
    // HTTP handler would publish a Content-Length before streaming.
    println!("archive size: {} bytes", stream.total_size()?);

    let mut out = File::create("demo.zip")?;
    let mut written = 0u64;
    for chunk in stream.generate()? {
        let chunk = chunk?;
        written += chunk.len() as u64;
        out.write_all(&chunk)?;
    }

    println!("wrote demo.zip ({written} bytes)");
    Ok(())
}
