//! Grid collage of a bundle's images.
//!
//! Up to [`MAX_TILES`] images are square-cropped around their centre, shrunk
//! to fit a cell and pasted row-major onto a fixed black canvas.

use crate::classify::FileKind;
use crate::picture;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const CANVAS_W: u32 = 1000;
pub const CANVAS_H: u32 = 1000;
pub const MAX_TILES: usize = 9;
const JPEG_QUALITY: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub count: usize,
    pub rows: usize,
    pub columns: usize,
    pub cell_w: f64,
    pub cell_h: f64,
}

impl GridLayout {
    /// Layout for `n` candidate images, or `None` when there are none.
    pub fn for_count(n: usize) -> Option<Self> {
        let count = n.min(MAX_TILES);
        if count == 0 {
            return None;
        }
        let columns = if count < 2 { 1 } else { 2 };
        let rows = count.div_ceil(2);
        Some(Self {
            count,
            rows,
            columns,
            cell_w: f64::from(CANVAS_W) / columns as f64,
            cell_h: f64::from(CANVAS_H) / rows as f64,
        })
    }

    /// Top-left pixel of the `index`th tile, filling rows left to right.
    pub fn origin(&self, index: usize) -> (i64, i64) {
        let col = index % self.columns;
        let row = index / self.columns;
        (
            (col as f64 * self.cell_w) as i64,
            (row as f64 * self.cell_h) as i64,
        )
    }

    /// Largest square side that fits in one cell.
    pub fn tile_side(&self) -> u32 {
        self.cell_w.min(self.cell_h).floor() as u32
    }
}

/// Members of a bundle the composer will use, in order. Audio and any other
/// non-image names are dropped.
pub fn select_images(files: &[PathBuf]) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|p| {
            p.file_name()
                .map(|n| FileKind::of(&n.to_string_lossy()) == Some(FileKind::Image))
                .unwrap_or(false)
        })
        .take(MAX_TILES)
        .cloned()
        .collect()
}

/// Build the collage for `files` and write it to `out` as JPEG.
///
/// Returns `Ok(None)` when there is no image to lay out. Any tile that fails
/// to load aborts the collage and nothing is written.
pub fn compose(files: &[PathBuf], out: &Path) -> Result<Option<GridLayout>> {
    let images = select_images(files);
    let Some(layout) = GridLayout::for_count(images.len()) else {
        return Ok(None);
    };

    let mut canvas = RgbImage::new(CANVAS_W, CANVAS_H);
    for (idx, path) in images.iter().take(layout.count).enumerate() {
        let img = picture::load(path)?;
        let tile = square_tile(&img, layout.tile_side());
        let (x, y) = layout.origin(idx);
        imageops::overlay(&mut canvas, &tile, x, y);
    }

    write_jpeg_atomic(&canvas, out)?;
    Ok(Some(layout))
}

/// Centre-crop to a square on the shorter side, then shrink to at most
/// `max_side`. Small images are never enlarged.
fn square_tile(img: &DynamicImage, max_side: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let side = w.min(h);
    let cropped = img.crop_imm((w - side) / 2, (h - side) / 2, side, side);
    let target = side.min(max_side).max(1);
    if target < side {
        cropped
            .resize_exact(target, target, FilterType::Triangle)
            .to_rgb8()
    } else {
        cropped.to_rgb8()
    }
}

// Concurrent bundles may target the same file; persist() swaps it in whole.
fn write_jpeg_atomic(canvas: &RgbImage, out: &Path) -> Result<()> {
    let dir = match out.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create thumbnail dir {}", dir.display()))?;

    let mut tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("create temp thumbnail in {}", dir.display()))?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        JpegEncoder::new_with_quality(&mut w, JPEG_QUALITY)
            .encode_image(canvas)
            .context("encode thumbnail jpeg")?;
        w.flush()?;
    }
    tmp.persist(out)
        .with_context(|| format!("write thumbnail {}", out.display()))?;
    Ok(())
}
