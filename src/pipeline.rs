//! The download/convert pipeline: streams the selected format to disk and
//! optionally pipes the result through the audio transcoder.
//!
//! One download runs per session. There is no retry, resume, cancellation
//! or timeout; any failure surfaces as a single terminal `Failed` event and
//! the UI offers a full restart.

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::Error;
use crate::model::PipelineEvent;
use crate::selection::Selection;
use crate::transcode::{FfmpegTranscoder, Transcoder};

/// Everything the pipeline needs, distilled from a validated [`Selection`].
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    /// Direct media URL of the chosen format
    pub source_url: String,
    /// Join of output path and name, as the user typed it
    pub destination: PathBuf,
    /// Present when the result must be transcoded to MP3
    pub transcode: Option<TranscodePlan>,
}

/// The two-phase MP3 variant: download first, transcode second. Keeps
/// byte-level progress during the download at the cost of a temp file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodePlan {
    /// Intermediate download target, deleted after a successful transcode
    pub intermediate: PathBuf,
    /// Final MP3 path
    pub final_path: PathBuf,
}

impl DownloadPlan {
    /// Build a plan from a selection. `None` when the selection is
    /// incomplete or the chosen format carries no direct URL.
    pub fn from_selection(selection: &Selection) -> Option<Self> {
        if !selection.validate() {
            return None;
        }
        let format = selection.selected_format()?;
        let source_url = format.url.clone().filter(|u| !u.is_empty())?;
        let destination = selection.output_file();
        let transcode = if selection.force_mp3 == Some(true) {
            Some(TranscodePlan::for_destination(&destination, &format.ext))
        } else {
            None
        };
        Some(Self {
            source_url,
            destination,
            transcode,
        })
    }

    /// Where the downloaded bytes land.
    pub fn download_path(&self) -> &Path {
        match &self.transcode {
            Some(plan) => &plan.intermediate,
            None => &self.destination,
        }
    }

    /// The file that remains when the pipeline finishes.
    pub fn final_path(&self) -> &Path {
        match &self.transcode {
            Some(plan) => &plan.final_path,
            None => &self.destination,
        }
    }
}

impl TranscodePlan {
    /// The destination as named becomes the intermediate and the final file
    /// swaps the extension to `.mp3`. When the name already ends in `.mp3`
    /// the intermediate takes the source container's extension instead, so
    /// the transcoder never reads and writes the same path.
    fn for_destination(destination: &Path, container: &str) -> Self {
        let final_path = destination.with_extension("mp3");
        let intermediate = if final_path == destination {
            let ext = if container.is_empty() { "tmp" } else { container };
            let candidate = destination.with_extension(ext);
            if candidate == final_path {
                destination.with_extension("tmp")
            } else {
                candidate
            }
        } else {
            destination.to_path_buf()
        };
        Self {
            intermediate,
            final_path,
        }
    }
}

/// Entry point used by the UI: runs the pipeline against the real HTTP
/// client and ffmpeg.
pub async fn spawn_download(plan: DownloadPlan, events: UnboundedSender<PipelineEvent>) {
    let client = reqwest::Client::new();
    run_with(&plan, &client, &FfmpegTranscoder, &events).await;
}

/// Drive the pipeline with explicit collaborators and close the event
/// stream with its single terminal event.
pub async fn run_with<T: Transcoder>(
    plan: &DownloadPlan,
    client: &reqwest::Client,
    transcoder: &T,
    events: &UnboundedSender<PipelineEvent>,
) {
    match run(plan, client, transcoder, events).await {
        Ok(path) => {
            log::info!("pipeline finished: {}", path.display());
            let _ = events.send(PipelineEvent::Done(path));
        }
        Err(err) => {
            log::error!("pipeline failed: {err}");
            let _ = events.send(PipelineEvent::Failed(err.to_string()));
        }
    }
}

async fn run<T: Transcoder>(
    plan: &DownloadPlan,
    client: &reqwest::Client,
    transcoder: &T,
    events: &UnboundedSender<PipelineEvent>,
) -> Result<PathBuf, Error> {
    stream_to_file(client, &plan.source_url, plan.download_path(), events).await?;
    convert_stage(plan, transcoder, events).await
}

/// Second phase: optional transcode plus intermediate cleanup. The
/// intermediate only goes away once the transcode definitely succeeded.
async fn convert_stage<T: Transcoder>(
    plan: &DownloadPlan,
    transcoder: &T,
    events: &UnboundedSender<PipelineEvent>,
) -> Result<PathBuf, Error> {
    if let Some(transcode) = &plan.transcode {
        let _ = events.send(PipelineEvent::Transcoding);
        transcoder
            .to_mp3(&transcode.intermediate, &transcode.final_path)
            .await?;
        tokio::fs::remove_file(&transcode.intermediate).await?;
    }
    Ok(plan.final_path().to_path_buf())
}

/// Stream the response body to `path`, reporting byte counts as we go.
async fn stream_to_file(
    client: &reqwest::Client,
    url: &str,
    path: &Path,
    events: &UnboundedSender<PipelineEvent>,
) -> Result<u64, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(Error::HttpStatus(response.status().as_u16()));
    }
    let total = response.content_length();

    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    let mut downloaded: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        let _ = events.send(PipelineEvent::Progress { downloaded, total });
    }
    writer.flush().await?;

    log::info!("downloaded {downloaded} bytes to {}", path.display());
    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{VideoFormat, VideoInfo};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::unbounded_channel;

    struct FakeTranscoder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeTranscoder {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transcoder for FakeTranscoder {
        async fn to_mp3(&self, _input: &Path, output: &Path) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Transcode("simulated failure".to_string()));
            }
            tokio::fs::write(output, b"mp3").await?;
            Ok(())
        }
    }

    fn selection(force_mp3: bool, name: &str) -> Selection {
        Selection {
            video_info: Some(VideoInfo {
                title: Some("A Video".to_string()),
                formats: vec![VideoFormat {
                    format_id: "22".to_string(),
                    ext: "mp4".to_string(),
                    url: Some("https://cdn.example.com/v.mp4".to_string()),
                    protocol: Some("https".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            format_index: Some(0),
            output_name: name.to_string(),
            output_path: "/out".to_string(),
            force_mp3: Some(force_mp3),
        }
    }

    #[test]
    fn direct_plan_writes_exactly_one_file() {
        let plan = DownloadPlan::from_selection(&selection(false, "clip.mp4")).unwrap();
        assert!(plan.transcode.is_none());
        assert_eq!(plan.destination, Path::new("/out").join("clip.mp4"));
        assert_eq!(plan.download_path(), plan.final_path());
    }

    #[test]
    fn mp3_plan_downloads_to_intermediate_and_swaps_extension() {
        let plan = DownloadPlan::from_selection(&selection(true, "clip.mp4")).unwrap();
        let transcode = plan.transcode.as_ref().unwrap();
        assert_eq!(transcode.intermediate, Path::new("/out").join("clip.mp4"));
        assert_eq!(transcode.final_path, Path::new("/out").join("clip.mp3"));
        assert_eq!(plan.download_path(), transcode.intermediate.as_path());
        assert_eq!(plan.final_path(), transcode.final_path.as_path());
    }

    #[test]
    fn mp3_plan_avoids_colliding_with_an_mp3_name() {
        let plan = DownloadPlan::from_selection(&selection(true, "clip.mp3")).unwrap();
        let transcode = plan.transcode.as_ref().unwrap();
        assert_eq!(transcode.final_path, Path::new("/out").join("clip.mp3"));
        assert_eq!(transcode.intermediate, Path::new("/out").join("clip.mp4"));
    }

    #[test]
    fn mp3_plan_collision_with_mp3_container_falls_back_to_tmp() {
        let mut s = selection(true, "clip.mp3");
        s.video_info.as_mut().unwrap().formats[0].ext = "mp3".to_string();
        let plan = DownloadPlan::from_selection(&s).unwrap();
        let transcode = plan.transcode.as_ref().unwrap();
        assert_eq!(transcode.intermediate, Path::new("/out").join("clip.tmp"));
        assert_ne!(transcode.intermediate, transcode.final_path);
    }

    #[test]
    fn incomplete_selection_yields_no_plan() {
        let mut s = selection(false, "clip.mp4");
        s.output_path.clear();
        assert!(DownloadPlan::from_selection(&s).is_none());
    }

    #[test]
    fn format_without_stream_url_yields_no_plan() {
        let mut s = selection(false, "clip.mp4");
        s.video_info.as_mut().unwrap().formats[0].url = None;
        assert!(DownloadPlan::from_selection(&s).is_none());
    }

    #[tokio::test]
    async fn successful_transcode_runs_once_and_deletes_the_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = dir.path().join("clip.mp4");
        let final_path = dir.path().join("clip.mp3");
        tokio::fs::write(&intermediate, b"video").await.unwrap();

        let plan = DownloadPlan {
            source_url: "https://cdn.example.com/v.mp4".to_string(),
            destination: intermediate.clone(),
            transcode: Some(TranscodePlan {
                intermediate: intermediate.clone(),
                final_path: final_path.clone(),
            }),
        };
        let transcoder = FakeTranscoder::new(false);
        let (tx, mut rx) = unbounded_channel();

        let result = convert_stage(&plan, &transcoder, &tx).await.unwrap();

        assert_eq!(result, final_path);
        assert_eq!(transcoder.calls(), 1);
        assert!(!intermediate.exists());
        assert!(final_path.exists());
        assert!(matches!(rx.try_recv(), Ok(PipelineEvent::Transcoding)));
    }

    #[tokio::test]
    async fn failed_transcode_keeps_the_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = dir.path().join("clip.mp4");
        let final_path = dir.path().join("clip.mp3");
        tokio::fs::write(&intermediate, b"video").await.unwrap();

        let plan = DownloadPlan {
            source_url: "https://cdn.example.com/v.mp4".to_string(),
            destination: intermediate.clone(),
            transcode: Some(TranscodePlan {
                intermediate: intermediate.clone(),
                final_path,
            }),
        };
        let transcoder = FakeTranscoder::new(true);
        let (tx, _rx) = unbounded_channel();

        let result = convert_stage(&plan, &transcoder, &tx).await;

        assert!(matches!(result, Err(Error::Transcode(_))));
        assert_eq!(transcoder.calls(), 1);
        assert!(intermediate.exists());
    }

    #[tokio::test]
    async fn direct_download_never_invokes_the_transcoder() {
        let plan = DownloadPlan::from_selection(&selection(false, "clip.mp4")).unwrap();
        let transcoder = FakeTranscoder::new(false);
        let (tx, mut rx) = unbounded_channel();

        let result = convert_stage(&plan, &transcoder, &tx).await.unwrap();

        assert_eq!(result, Path::new("/out").join("clip.mp4"));
        assert_eq!(transcoder.calls(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn a_successful_run_reports_progress_and_one_done_event() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let response = [
            format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .into_bytes(),
            body.clone(),
        ]
        .concat();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            socket.write_all(&response).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("clip.mp4");
        let plan = DownloadPlan {
            source_url: format!("http://{addr}/v.mp4"),
            destination: destination.clone(),
            transcode: None,
        };
        let transcoder = FakeTranscoder::new(false);
        let client = reqwest::Client::new();
        let (tx, mut rx) = unbounded_channel();

        run_with(&plan, &client, &transcoder, &tx).await;
        drop(tx);
        server.await.unwrap();

        let mut last_downloaded = 0;
        let mut dones = 0;
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Progress { downloaded, total } => {
                    assert!(downloaded >= last_downloaded);
                    assert_eq!(total, Some(body.len() as u64));
                    last_downloaded = downloaded;
                }
                PipelineEvent::Done(path) => {
                    dones += 1;
                    assert_eq!(path, destination);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(dones, 1);
        assert_eq!(last_downloaded, body.len() as u64);
        assert_eq!(transcoder.calls(), 0);
        assert_eq!(tokio::fs::read(&destination).await.unwrap(), body);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn a_failing_run_emits_exactly_one_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let plan = DownloadPlan {
            // Nothing listens on the discard port, so the request fails fast
            source_url: "http://127.0.0.1:9/v.mp4".to_string(),
            destination: dir.path().join("clip.mp4"),
            transcode: None,
        };
        let transcoder = FakeTranscoder::new(false);
        let client = reqwest::Client::new();
        let (tx, mut rx) = unbounded_channel();

        run_with(&plan, &client, &transcoder, &tx).await;
        drop(tx);

        let mut terminals = 0;
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Done(_) => panic!("nothing should succeed here"),
                PipelineEvent::Failed(_) => terminals += 1,
                _ => {}
            }
        }
        assert_eq!(terminals, 1);
        assert_eq!(transcoder.calls(), 0);
    }
}
