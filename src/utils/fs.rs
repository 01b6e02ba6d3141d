//! Filesystem helpers shared by the scheduler and the codec pipeline.

use std::fs;
use std::io;
use std::path::Path;

/// Get file size in bytes
pub fn file_size(path: impl AsRef<Path>) -> io::Result<u64> {
    fs::metadata(path.as_ref()).map(|m| m.len())
}

/// Write `bytes` to `path` atomically.
///
/// The data goes to a `.part` temporary file in the destination directory
/// first and is renamed into place afterwards, so an interrupted run never
/// leaves a truncated output where a complete file is expected. Rename is
/// atomic only within one filesystem, hence the sibling temp file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;

    let tmp = path.with_file_name(format!("{file_name}.part"));
    fs::write(&tmp, bytes)?;

    match fs::rename(&tmp, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Don't leave the partial file behind on a failed rename
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
