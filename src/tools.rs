//! Discovery of the external executables the app drives (yt-dlp and ffmpeg).
//!
//! Resolution order: a copy embedded at build time under `assets/`, extracted
//! once into the temp dir; then well-known install locations; then whatever
//! `$PATH` resolves.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use rust_embed::RustEmbed;

use crate::error::Error;

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Locate the yt-dlp executable.
pub fn find_ytdlp() -> Result<PathBuf, Error> {
    find_tool("yt-dlp")
}

/// Locate the ffmpeg executable.
pub fn find_ffmpeg() -> Result<PathBuf, Error> {
    find_tool("ffmpeg")
}

fn find_tool(name: &'static str) -> Result<PathBuf, Error> {
    if let Some(path) = extract_embedded(name)? {
        return Ok(path);
    }
    let dirs = ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"].map(PathBuf::from);
    if let Some(path) = find_in_dirs(name, &dirs) {
        return Ok(path);
    }
    search_path(name).ok_or(Error::ToolMissing(name))
}

fn find_in_dirs(name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    let bin = binary_name(name);
    dirs.iter()
        .map(|dir| dir.join(&bin))
        .find(|candidate| candidate.is_file())
}

fn binary_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Writes the embedded binary into the temp dir on first use and reuses it
/// afterwards. `None` when no binary was bundled at build time.
fn extract_embedded(name: &str) -> Result<Option<PathBuf>, Error> {
    let bin = binary_name(name);
    let Some(data) = Asset::get(&bin) else {
        return Ok(None);
    };
    let target = std::env::temp_dir().join(&bin);
    if !target.exists() {
        let mut file = File::create(&target)?;
        file.write_all(&data.data)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))?;
        }
    }
    Ok(Some(target))
}

fn search_path(name: &str) -> Option<PathBuf> {
    let bin = binary_name(name);
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(&bin))
        .find(|candidate| candidate.is_file())
}
