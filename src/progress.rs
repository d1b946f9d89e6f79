//! Progress math for the download phase.

/// Fraction of the download completed, clamped to 0..=1.
///
/// Unknown or zero totals report 0.0; the UI shows the running byte count
/// instead of a made-up percentage in that case.
pub fn fraction(downloaded: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if total > 0 => ((downloaded as f64 / total as f64) as f32).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Human-readable byte count for the progress label.
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let value = bytes as f64;
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.1} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.0} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
