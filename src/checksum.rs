use crate::error::ExtractError;
use crate::util;

use md5::{Digest, Md5};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const READ_BUF_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    pub size: u64,
    /// 32 lowercase hex chars.
    pub checksum: String,
}

/// Hash the whole file with MD5 and count its bytes in the same pass.
pub fn digest_file(path: &Path) -> Result<FileDigest, ExtractError> {
    let mut f = File::open(path).map_err(|e| ExtractError::io(path, e))?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; READ_BUF_BYTES];
    let mut size = 0u64;

    loop {
        let n = f.read(&mut buf).map_err(|e| ExtractError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok(FileDigest {
        size,
        checksum: util::hex_lower(&hasher.finalize()),
    })
}

/// Digest of bytes already in memory, for callers that need the content too.
pub fn digest_bytes(bytes: &[u8]) -> FileDigest {
    FileDigest {
        size: bytes.len() as u64,
        checksum: util::hex_lower(&Md5::digest(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn known_digests() {
        let tmp = TempDir::new().expect("tempdir");
        let hello = tmp.path().join("hello.txt");
        let empty = tmp.path().join("empty.txt");
        fs::write(&hello, b"hello").expect("write");
        fs::write(&empty, b"").expect("write");

        let d = digest_file(&hello).expect("digest");
        assert_eq!(d.size, 5);
        assert_eq!(d.checksum, "5d41402abc4b2a76b9719d911017c592");

        let d = digest_file(&empty).expect("digest");
        assert_eq!(d.size, 0);
        assert_eq!(d.checksum, "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_is_stable_across_runs_and_spans_buffers() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("big.bin");
        let data: Vec<u8> = (0..(READ_BUF_BYTES * 2 + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        fs::write(&path, &data).expect("write");

        let first = digest_file(&path).expect("digest");
        let second = digest_file(&path).expect("digest");
        assert_eq!(first, second);
        assert_eq!(first, digest_bytes(&data));
        assert_eq!(first.size, data.len() as u64);
        assert_eq!(first.checksum.len(), 32);
    }

    #[test]
    fn missing_file_is_io_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = digest_file(&tmp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
