use eframe::egui::ColorImage;

/// Downloads and decodes the metadata-provided thumbnail for display.
///
/// Returns `None` on any network or decode failure; the UI simply shows no
/// image in that case. Blocking, so call it from a blocking task.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    if url.is_empty() {
        return None;
    }
    // Perform a blocking HTTP GET request, returning None on any error
    let bytes = reqwest::blocking::get(url).ok()?.bytes().ok()?;
    // Decode into RGBA8 for egui
    let img = image::load_from_memory(&bytes).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}
