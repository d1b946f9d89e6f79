//! Completion notification and helpers for opening the finished download.

use std::path::Path;

use notify_rust::Notification;

/// Post a system notification for a finished download.
///
/// On XDG desktops the notification's default action opens the file and the
/// call blocks until the notification is dismissed, so run it on a blocking
/// task. Elsewhere the notification is informational only; the Done screen
/// carries its own Open File button.
pub fn notify_completed(path: &Path) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let target = path.to_path_buf();
        let shown = Notification::new()
            .summary("Download complete")
            .body(&file_name)
            .action("default", "Open")
            .show();
        match shown {
            Ok(handle) => handle.wait_for_action(move |action| {
                if action == "default" {
                    open_file(&target);
                }
            }),
            Err(err) => log::warn!("could not show notification: {err}"),
        }
    }

    #[cfg(not(all(unix, not(target_os = "macos"))))]
    {
        let shown = Notification::new()
            .summary("Download complete")
            .body(&file_name)
            .show();
        if let Err(err) = shown {
            log::warn!("could not show notification: {err}");
        }
    }
}

/// Open the file with the system default handler.
pub fn open_file(path: &Path) {
    if let Err(err) = open::that(path) {
        log::warn!("could not open {}: {err}", path.display());
    }
}

/// Open the folder containing the file.
pub fn open_folder(path: &Path) {
    let folder = path.parent().filter(|p| !p.as_os_str().is_empty());
    let target = folder.unwrap_or(path);
    if let Err(err) = open::that(target) {
        log::warn!("could not open {}: {err}", target.display());
    }
}
