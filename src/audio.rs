use crate::checksum;
use crate::error::ExtractError;
use crate::manifest::AudioRecord;

use std::path::Path;

pub fn extract(path: &Path) -> Result<AudioRecord, ExtractError> {
    let (frames, rate) = {
        // Reader (and its file handle) is dropped at the end of this block.
        let reader = hound::WavReader::open(path).map_err(|e| wav_error(path, e))?;
        (reader.duration(), reader.spec().sample_rate)
    };
    let duration_secs = duration_secs(u64::from(frames), rate)
        .ok_or_else(|| ExtractError::format(path, "sample rate is zero"))?;
    let digest = checksum::digest_file(path)?;

    Ok(AudioRecord {
        header: digest.into(),
        duration_secs,
    })
}

/// Whole seconds for `frames` per channel at `rate` Hz, halves rounded to even.
pub fn duration_secs(frames: u64, rate: u32) -> Option<u64> {
    if rate == 0 {
        return None;
    }
    let secs = frames as f64 / f64::from(rate);
    Some(secs.round_ties_even() as u64)
}

// A file that ends inside its own header is malformed, not unreadable.
fn wav_error(path: &Path, err: hound::Error) -> ExtractError {
    match err {
        hound::Error::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            ExtractError::format(path, e)
        }
        hound::Error::IoError(e) => ExtractError::io(path, e),
        other => ExtractError::format(path, other),
    }
}
