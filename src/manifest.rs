use crate::checksum::FileDigest;
use crate::classify::BundleKind;
use crate::error::ExtractError;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Metadata document written once per bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PuzzleManifest {
    #[serde(rename = "type")]
    pub kind: BundleKind,
    pub size: u64,
    #[serde(rename = "filesData")]
    pub files_data: Vec<FileRecord>,
}

impl PuzzleManifest {
    pub fn new(kind: BundleKind) -> Self {
        Self {
            kind,
            size: 0,
            files_data: vec![],
        }
    }

    /// Append a record and fold its size into the bundle total.
    pub fn add(&mut self, record: FileRecord) {
        self.size += record.header().size;
        self.files_data.push(record);
    }

    /// Pretty JSON with 4-space indentation.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(256 + self.files_data.len() * 256);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(out)
    }

    /// Create or overwrite `path` with the manifest JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), ExtractError> {
        let json = self
            .to_json()
            .map_err(|e| ExtractError::io(path, e.into()))?;
        let f = File::create(path).map_err(|e| ExtractError::io(path, e))?;
        let mut w = BufWriter::new(f);
        w.write_all(&json).map_err(|e| ExtractError::io(path, e))?;
        w.flush().map_err(|e| ExtractError::io(path, e))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn read_from(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Fields every record carries, whatever its media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub size: u64,
    pub checksum: String,
}

impl From<FileDigest> for FileHeader {
    fn from(d: FileDigest) -> Self {
        Self {
            size: d.size,
            checksum: d.checksum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FileRecord {
    #[serde(rename = "txt")]
    Text(TextRecord),
    #[serde(rename = "wav")]
    Audio(AudioRecord),
    #[serde(rename = "png")]
    Image(ImageRecord),
}

impl FileRecord {
    pub fn header(&self) -> &FileHeader {
        match self {
            FileRecord::Text(r) => &r.header,
            FileRecord::Audio(r) => &r.header,
            FileRecord::Image(r) => &r.header,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    #[serde(flatten)]
    pub header: FileHeader,
    // Field names are part of the published manifest format, typos included.
    #[serde(rename = "numOfUniqeWords")]
    pub unique_words: usize,
    #[serde(rename = "mostContainerWord")]
    pub container_word: String,
    #[serde(rename = "numOfContainerWord")]
    pub container_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRecord {
    #[serde(flatten)]
    pub header: FileHeader,
    #[serde(rename = "durationInSec")]
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(flatten)]
    pub header: FileHeader,
    pub height: u32,
    pub width: u32,
    /// Dominant colours as `#rrggbb`. Clustering is not implemented, so this
    /// and `cluster_pixel_counts` are always empty.
    #[serde(rename = "colorClusters", default)]
    pub color_clusters: Vec<String>,
    #[serde(rename = "numOfPixesOfClusters", default)]
    pub cluster_pixel_counts: Vec<u64>,
}
