use thiserror::Error;

/// Error taxonomy for metadata retrieval and the download pipeline.
///
/// Only `InvalidUrl` gets special treatment in the UI; everything else ends
/// up on the generic error screen with a restart affordance.
#[derive(Debug, Error)]
pub enum Error {
    /// The URL is malformed or points at something yt-dlp cannot handle
    #[error("unsupported or malformed video URL: {0}")]
    InvalidUrl(String),

    /// Metadata retrieval failed for any other reason
    #[error("could not retrieve video info: {0}")]
    Info(String),

    /// The selected format carries no direct stream URL
    #[error("the selected format has no downloadable stream")]
    NoStreamUrl,

    /// Network failure while streaming the media body
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server answered HTTP {0}")]
    HttpStatus(u16),

    /// Filesystem failure while writing the output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ffmpeg exited unsuccessfully
    #[error("audio transcode failed: {0}")]
    Transcode(String),

    /// A required external executable could not be found
    #[error("{0} not found; install it or bundle it under assets/")]
    ToolMissing(&'static str),
}
