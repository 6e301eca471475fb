use crate::checksum;
use crate::error::ExtractError;
use crate::manifest::ImageRecord;

use image::{DynamicImage, ImageError, ImageReader};
use std::path::Path;

pub fn extract(path: &Path) -> Result<ImageRecord, ExtractError> {
    let (width, height) = open_reader(path)?
        .into_dimensions()
        .map_err(|e| image_error(path, e))?;
    let digest = checksum::digest_file(path)?;

    Ok(ImageRecord {
        header: digest.into(),
        height,
        width,
        color_clusters: vec![],
        cluster_pixel_counts: vec![],
    })
}

/// Fully decode the image at `path`.
pub fn load(path: &Path) -> Result<DynamicImage, ExtractError> {
    open_reader(path)?
        .decode()
        .map_err(|e| image_error(path, e))
}

// Format is sniffed from the content so `.PNG` and mislabelled files behave
// the same as `.png`.
fn open_reader(path: &Path) -> Result<ImageReader<std::io::BufReader<std::fs::File>>, ExtractError> {
    ImageReader::open(path)
        .map_err(|e| ExtractError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| ExtractError::io(path, e))
}

fn image_error(path: &Path, err: ImageError) -> ExtractError {
    match err {
        ImageError::IoError(e) => ExtractError::io(path, e),
        other => ExtractError::format(path, other),
    }
}
