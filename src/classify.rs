use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleKind {
    Text,
    Visual,
    #[serde(rename = "Audio-Visual")]
    AudioVisual,
}

impl fmt::Display for BundleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BundleKind::Text => "Text",
            BundleKind::Visual => "Visual",
            BundleKind::AudioVisual => "Audio-Visual",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Image,
    Audio,
}

impl FileKind {
    /// Suffix match is case sensitive; images accept `.png` and `.PNG` only.
    pub fn of(name: &str) -> Option<Self> {
        if name.ends_with(".txt") {
            Some(FileKind::Text)
        } else if name.ends_with(".png") || name.ends_with(".PNG") {
            Some(FileKind::Image)
        } else if name.ends_with(".wav") {
            Some(FileKind::Audio)
        } else {
            None
        }
    }
}

/// Decide a bundle's kind from all of its member names.
///
/// Every member must satisfy a rule for it to apply, and the rules are tried
/// in order Text, Visual, Audio-Visual. An empty bundle satisfies all three
/// vacuously and so is Text. `None` means no rule matched.
pub fn classify<I, S>(names: I) -> Option<BundleKind>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kinds: Vec<Option<FileKind>> = names
        .into_iter()
        .map(|n| FileKind::of(n.as_ref()))
        .collect();

    if kinds.iter().all(|k| *k == Some(FileKind::Text)) {
        Some(BundleKind::Text)
    } else if kinds.iter().all(|k| *k == Some(FileKind::Image)) {
        Some(BundleKind::Visual)
    } else if kinds
        .iter()
        .all(|k| matches!(k, Some(FileKind::Image) | Some(FileKind::Audio)))
    {
        Some(BundleKind::AudioVisual)
    } else {
        None
    }
}
