//! Data models: video metadata as reported by yt-dlp, and pipeline events.

use std::path::PathBuf;

use serde::Deserialize;

/// Metadata for one remote video, deserialized from `yt-dlp -J` output.
///
/// Every field is optional on the wire; display code goes through the
/// fallback accessors on [`crate::selection::Selection`] instead of reading
/// these directly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub formats: Vec<VideoFormat>,
}

/// One available encoding/container option for a video.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoFormat {
    #[serde(default)]
    pub format_id: String,
    /// Container extension ("mp4", "webm", ...)
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
    /// "none" means the format carries no video track
    #[serde(default)]
    pub vcodec: Option<String>,
    /// "none" means the format carries no audio track
    #[serde(default)]
    pub acodec: Option<String>,
    /// Audio bitrate in kbps
    #[serde(default)]
    pub abr: Option<f64>,
    #[serde(default)]
    pub filesize: Option<u64>,
    /// Direct media URL, absent for manifest-only formats
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
}

impl VideoFormat {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref().is_some_and(|c| c != "none")
    }

    pub fn has_audio(&self) -> bool {
        self.acodec.as_deref().is_some_and(|c| c != "none")
    }

    /// Whether the pipeline can stream this format straight over HTTP.
    /// HLS/DASH entries expose no plain URL and are filtered out upstream.
    pub fn is_direct(&self) -> bool {
        let has_url = self.url.as_deref().is_some_and(|u| !u.is_empty());
        let plain_http = match self.protocol.as_deref() {
            None => true,
            Some(p) => p == "http" || p == "https",
        };
        has_url && plain_http
    }

    /// Row text for the format list: container, then video and audio details.
    pub fn label(&self) -> String {
        let mut parts = vec![self.ext.clone()];
        if self.has_video() {
            if let Some(res) = &self.resolution {
                parts.push(res.clone());
            }
            if let Some(codec) = &self.vcodec {
                parts.push(codec.clone());
            }
        }
        if self.has_audio() {
            if let Some(abr) = self.abr {
                parts.push(format!("{abr:.0} kbps"));
            }
            if let Some(codec) = &self.acodec {
                parts.push(codec.clone());
            }
        }
        if let Some(size) = self.filesize {
            parts.push(crate::progress::format_bytes(size));
        }
        parts.retain(|p| !p.is_empty());
        parts.join(" | ")
    }
}

/// Events emitted by the download/convert pipeline.
///
/// Ordering guarantee: any number of `Progress`, at most one `Transcoding`,
/// then exactly one terminal `Done` or `Failed` per run.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Progress { downloaded: u64, total: Option<u64> },
    Transcoding,
    Done(PathBuf),
    Failed(String),
}
