//! The audio transcoder seam. Production use drives the ffmpeg executable;
//! pipeline tests substitute a counting fake.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::Error;
use crate::tools;

/// Fixed audio bitrate for forced-MP3 output, in kbps.
pub const MP3_BITRATE_KBPS: u32 = 256;

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Extract the audio track of `input` into an MP3 file at `output`.
    async fn to_mp3(&self, input: &Path, output: &Path) -> Result<(), Error>;
}

/// Drives the ffmpeg executable.
pub struct FfmpegTranscoder;

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn to_mp3(&self, input: &Path, output: &Path) -> Result<(), Error> {
        let ffmpeg = tools::find_ffmpeg()?;
        log::info!("transcoding {} to {}", input.display(), output.display());

        let result = Command::new(ffmpeg)
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vn")
            .arg("-b:a")
            .arg(format!("{MP3_BITRATE_KBPS}k"))
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let reason = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("ffmpeg exited with an error")
                .to_string();
            return Err(Error::Transcode(reason));
        }
        Ok(())
    }
}
