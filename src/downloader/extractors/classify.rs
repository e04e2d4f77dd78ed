//! Media type classification.
//!
//! Prober output is first lowered into [`MediaMetadata`], a small tagged tree
//! (gallery of entries, single entry, or something unusable), and then reduced
//! by pure functions. When no metadata is available, [`fallback_media_type`]
//! guesses from the platform and URL shape.

use serde_json::Value;

use crate::downloader::models::{MediaType, Platform};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "avif", "bmp"];

/// The fields of a single media entry that matter for classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaEntry {
    pub vcodec: Option<String>,
    pub duration: Option<f64>,
    pub ext: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaMetadata {
    /// Multi-entry listing (carousel, gallery, playlist)
    Gallery(Vec<MediaMetadata>),
    Single(MediaEntry),
    /// Not an object; carries no usable information
    Opaque,
}

impl MediaMetadata {
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::Opaque;
        };

        if let Some(entries) = object.get("entries").and_then(Value::as_array) {
            if !entries.is_empty() {
                return Self::Gallery(entries.iter().map(Self::from_value).collect());
            }
        }

        Self::Single(MediaEntry {
            vcodec: object.get("vcodec").and_then(Value::as_str).map(str::to_string),
            duration: object.get("duration").and_then(Value::as_f64),
            ext: object.get("ext").and_then(Value::as_str).map(str::to_string),
            width: object.get("width").and_then(Value::as_f64),
            height: object.get("height").and_then(Value::as_f64),
        })
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Gallery(entries) => reduce_entries(entries.iter().map(Self::media_type)),
            Self::Single(entry) => classify_entry(entry),
            Self::Opaque => MediaType::Unknown,
        }
    }
}

/// Classify raw prober output
pub fn classify_info(value: &Value) -> MediaType {
    MediaMetadata::from_value(value).media_type()
}

/// Unknown entries are ignored; a uniform remainder keeps its type, anything else is mixed
fn reduce_entries(types: impl Iterator<Item = MediaType>) -> MediaType {
    let mut known = types.filter(|t| *t != MediaType::Unknown);
    let Some(first) = known.next() else {
        return MediaType::Unknown;
    };

    if known.all(|t| t == first) {
        first
    } else {
        MediaType::Mixed
    }
}

fn classify_entry(entry: &MediaEntry) -> MediaType {
    let has_video_codec = entry.vcodec.as_deref().is_some_and(|v| v != "none");
    let has_duration = entry.duration.is_some_and(|d| d > 0.0);

    if has_video_codec || has_duration {
        return MediaType::Video;
    }

    let image_ext = entry
        .ext
        .as_deref()
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
    if image_ext {
        return MediaType::Image;
    }

    if entry.width.is_some() && entry.height.is_some() {
        return MediaType::Image;
    }

    MediaType::Unknown
}

/// Best guess when the prober is unavailable or failed
pub fn fallback_media_type(url: &str, platform: Platform) -> MediaType {
    let lower_url = url.to_lowercase();
    match platform {
        Platform::Kwai => MediaType::Video,
        Platform::Tiktok if lower_url.contains("/photo/") => MediaType::Image,
        Platform::Tiktok => MediaType::Video,
        Platform::Instagram if lower_url.contains("/reel/") || lower_url.contains("/tv/") => {
            MediaType::Video
        }
        // Posts and stories can hold either; only a probe can tell
        Platform::Instagram => MediaType::Mixed,
        Platform::Twitter | Platform::Unknown => MediaType::Unknown,
    }
}
