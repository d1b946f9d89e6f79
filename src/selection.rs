//! The Choice Store: one user's accumulated download configuration.
//!
//! Created empty at session start, populated across the three UI steps
//! (URL submission, format choice, output naming), consumed once by the
//! pipeline and discarded on reset. Nothing persists across sessions.

use std::path::{Path, PathBuf};

use crate::model::{VideoFormat, VideoInfo};

/// Title shown when the metadata carries none.
pub const FALLBACK_TITLE: &str = "Video";

#[derive(Debug, Default)]
pub struct Selection {
    /// Metadata blob from the info retriever
    pub video_info: Option<VideoInfo>,
    /// Index into the metadata's format list
    pub format_index: Option<usize>,
    /// Destination file name
    pub output_name: String,
    /// Destination directory
    pub output_path: String,
    /// Whether to transcode the result to MP3
    pub force_mp3: Option<bool>,
}

impl Selection {
    /// True once every field needed to start a download is present.
    pub fn validate(&self) -> bool {
        self.video_info.is_some()
            && self.format_index.is_some()
            && !self.output_name.is_empty()
            && !self.output_path.is_empty()
            && self.force_mp3.is_some()
    }

    /// The format the user picked. `None` until a choice is made, or when
    /// the index no longer points inside the format list.
    pub fn selected_format(&self) -> Option<&VideoFormat> {
        self.video_info.as_ref()?.formats.get(self.format_index?)
    }

    /// Destination file: directory-separator join of path and name.
    pub fn output_file(&self) -> PathBuf {
        Path::new(&self.output_path).join(&self.output_name)
    }

    pub fn title(&self) -> String {
        self.video_info
            .as_ref()
            .and_then(|info| info.title.clone())
            .unwrap_or_else(|| FALLBACK_TITLE.to_string())
    }

    pub fn author(&self) -> String {
        self.video_info
            .as_ref()
            .and_then(|info| info.uploader.clone())
            .unwrap_or_default()
    }

    pub fn thumbnail_url(&self) -> String {
        self.video_info
            .as_ref()
            .and_then(|info| info.thumbnail.clone())
            .unwrap_or_default()
    }

    /// Default output name: sanitized title plus the format's container.
    pub fn suggested_name(&self, format: &VideoFormat) -> String {
        let clean = sanitize_filename::sanitize(self.title());
        format!("{}.{}", clean.trim(), format.ext)
    }

    /// Back to the empty state; the next session starts from scratch.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Rewrites `name`'s extension when the MP3 toggle flips: `.mp3` when
/// forced, the source container's extension otherwise.
pub fn rename_extension(name: &str, force_mp3: bool, container: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let ext = if force_mp3 { "mp3" } else { container };
    format!("{stem}.{ext}")
}
