//! Failure kinds for per-file extraction and bundle classification.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The file could not be opened, read or written.
    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was readable but is not a valid image or waveform.
    #[error("format error in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// No extension rule matched the bundle's members.
    #[error("unclassified bundle {}: members are not all text, image or image+audio", dir.display())]
    Unclassified { dir: PathBuf },
}

impl ExtractError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn format(path: &Path, reason: impl ToString) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_path() {
        let err = ExtractError::format(Path::new("/tmp/b/x.png"), "bad header");
        assert_eq!(err.to_string(), "format error in /tmp/b/x.png: bad header");

        let err = ExtractError::io(
            Path::new("/tmp/b/y.txt"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().starts_with("io error on /tmp/b/y.txt"));
    }
}
