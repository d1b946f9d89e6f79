//! Info Retriever: resolves a URL to video metadata by running yt-dlp.

use tokio::process::Command;

use crate::error::Error;
use crate::model::VideoInfo;
use crate::tools;

/// Fetch metadata and the list of downloadable formats for `url`.
///
/// An unsupported or malformed URL maps to [`Error::InvalidUrl`]; every
/// other failure mode (spawn error, non-zero exit, bad JSON) collapses into
/// a generic retrieval error.
pub async fn fetch_video_info(url: &str) -> Result<VideoInfo, Error> {
    let ytdlp = tools::find_ytdlp()?;
    log::info!("fetching video info for {url}");

    let output = Command::new(ytdlp)
        .args(["-J", "--no-playlist", "--no-warnings", url])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("Unsupported URL") || stderr.contains("is not a valid URL") {
            return Err(Error::InvalidUrl(url.to_string()));
        }
        let reason = stderr
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("yt-dlp exited with an error")
            .to_string();
        return Err(Error::Info(reason));
    }

    parse_video_info(&output.stdout)
}

/// Parse `yt-dlp -J` output, keeping only formats the pipeline can stream.
pub fn parse_video_info(stdout: &[u8]) -> Result<VideoInfo, Error> {
    let mut info: VideoInfo = serde_json::from_slice(stdout)
        .map_err(|e| Error::Info(format!("unreadable yt-dlp JSON: {e}")))?;
    info.formats.retain(|format| format.is_direct());
    Ok(info)
}
