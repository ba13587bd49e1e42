use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

/// Error that occurs when opening or reading a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file `{path}`: {source}")]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use overseer::fsutil;
/// let reader = fsutil::open_file_reader("/run/dnsmasq.leases")?;
/// # Ok::<(), fsutil::FileReadError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileReadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileReadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Reads a small file, such as a sysfs attribute, and trims surrounding whitespace.
///
/// # Errors
///
/// Returns a [`FileReadError`] if the file cannot be opened or read.
pub fn read_trimmed(path: impl AsRef<Path>) -> Result<String, FileReadError> {
    let path = path.as_ref();
    let mut content = String::with_capacity(16);
    open_file_reader(path)?
        .read_to_string(&mut content)
        .map_err(|source| FileReadError {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(content.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_open_file_reader_success() {
        let tmp = tempfile::NamedTempFile::new().expect("failed to create temp file");
        let reader = open_file_reader(tmp.path()).expect("should open test file");
        let metadata = reader.get_ref().metadata().unwrap();
        assert!(metadata.is_file());
    }

    #[test]
    fn test_open_file_reader_error() {
        let err = open_file_reader("/definitely/does/not/exist").unwrap_err();
        assert_eq!(err.path, PathBuf::from("/definitely/does/not/exist"));
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_read_trimmed() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "  42 ").unwrap();
        assert_eq!(read_trimmed(tmp.path()).unwrap(), "42");
    }
}
