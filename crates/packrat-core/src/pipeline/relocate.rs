//! Copying the final artifact to its destination.

use std::fs::File;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;
use std::io::{self};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Copies `source` to the new file `destination`.
///
/// The destination must not exist. A partially written destination is
/// removed before the error is returned, so the source stays the only copy.
///
/// # Errors
///
/// Returns the underlying I/O error; `AlreadyExists` if `destination` is
/// taken.
pub fn copy_new(source: &Path, destination: &Path) -> io::Result<u64> {
    let mut input = File::open(source)?;
    let mut output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;

    match copy_all(&mut input, &mut output).and_then(|n| output.sync_all().map(|()| n)) {
        Ok(n) => Ok(n),
        Err(e) => {
            drop(output);
            let _ = std::fs::remove_file(destination);
            Err(e)
        }
    }
}

fn copy_all<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }

    writer.flush()?;
    Ok(total)
}
