// LogLens - platform/fs.rs
//
// Filesystem helpers for log and profile files.
// All reads decode lossily; log files are never rejected for bad UTF-8.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Read a whole log file as text.
///
/// Files larger than `large_file_threshold` bytes are memory-mapped instead
/// of read into an intermediate buffer.
pub fn read_log_file(path: &Path, large_file_threshold: u64) -> io::Result<String> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    if size > large_file_threshold {
        tracing::debug!(
            file = %path.display(),
            size,
            threshold = large_file_threshold,
            "Memory-mapping large log file"
        );
        // SAFETY: the map is read-only and dropped before returning. A log
        // writer truncating the file meanwhile is an accepted risk for a
        // viewer of already-written logs.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        return Ok(String::from_utf8_lossy(&mmap).into_owned());
    }

    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Read the first `max_lines` lines of a file, for format detection.
pub fn read_first_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::with_capacity(max_lines);
    let mut buf = Vec::new();

    while lines.len() < max_lines {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        lines.push(text.trim_end_matches(['\n', '\r']).to_string());
    }
    Ok(lines)
}

/// Size of a file in bytes.
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(std::fs::metadata(path)?.len())
}

/// Copy `source` to `target`, failing with `AlreadyExists` instead of
/// overwriting. A partial copy is removed.
pub fn copy_new(source: &Path, target: &Path) -> io::Result<()> {
    let mut from = File::open(source)?;
    let mut to = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)?;
    if let Err(e) = io::copy(&mut from, &mut to) {
        drop(to);
        let _ = std::fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}

/// Replace `path` with `content`. When `backup` is set, the current file is
/// first copied to `backup`, replacing any older backup.
///
/// The new content goes to a sibling temp file that is renamed over `path`,
/// so a failed write leaves the previous document in place.
pub fn write_with_backup(path: &Path, content: &str, backup: Option<&Path>) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_sibling(path);
    if let Err(e) = std::fs::write(&tmp, content) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    let rotate = match backup {
        Some(backup) if path.exists() => std::fs::copy(path, backup).map(|_| ()),
        _ => Ok(()),
    };
    if let Err(e) = rotate.and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".tmp");
    PathBuf::from(raw)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_log_file_both_paths_agree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"line one\nline \xfe two\n").unwrap();
        drop(f);

        let small = read_log_file(&path, u64::MAX).unwrap();
        let mapped = read_log_file(&path, 0).unwrap();
        assert_eq!(small, mapped);
        assert!(small.contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_first_lines_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "a\r\nb\nc\nd\n").unwrap();
        assert_eq!(read_first_lines(&path, 2).unwrap(), vec!["a", "b"]);
        assert_eq!(read_first_lines(&path, 10).unwrap().len(), 4);
    }

    #[test]
    fn test_write_with_backup_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.toml");
        let backup = dir.path().join("p.toml.back");

        write_with_backup(&path, "v1", Some(&backup)).unwrap();
        assert!(!backup.exists());
        write_with_backup(&path, "v2", Some(&backup)).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "v1");
        write_with_backup(&path, "v3", Some(&backup)).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "v2");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "v3");
    }

    #[test]
    fn test_failed_write_keeps_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.toml");
        let backup = dir.path().join("p.toml.back");
        write_with_backup(&path, "v1", Some(&backup)).unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(dir.path().join("p.toml.tmp")).unwrap();
        assert!(write_with_backup(&path, "v2", Some(&backup)).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "v1");
        assert!(!backup.exists());
    }

    #[test]
    fn test_copy_new_never_overwrites() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let src = src_dir.path().join("fmt.toml");
        let dst = dst_dir.path().join("fmt.toml");
        std::fs::write(&src, "new").unwrap();

        copy_new(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");

        std::fs::write(&dst, "owned").unwrap();
        let err = copy_new(&src, &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "owned");
    }

    #[test]
    fn test_remove_if_exists_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(remove_if_exists(&dir.path().join("nope")).is_ok());
    }
}
