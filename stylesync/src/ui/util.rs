//! Small UI helpers: human-readable sizes and usage colours.

use ratatui::style::Color;

pub fn human(b: u64) -> String {
    const K: f64 = 1024.0;
    let b = b as f64;
    if b < K {
        return format!("{b:.0}B");
    }
    let kb = b / K;
    if kb < K {
        return format!("{kb:.1}KB");
    }
    let mb = kb / K;
    if mb < K {
        return format!("{mb:.1}MB");
    }
    let gb = mb / K;
    if gb < K {
        return format!("{gb:.1}GB");
    }
    let tb = gb / K;
    format!("{tb:.2}TB")
}

/// Bytes as GiB rounded to two decimals, e.g. `"7.63 GB"`.
pub fn gib(b: u64) -> String {
    format!("{:.2} GB", b as f64 / (1024.0 * 1024.0 * 1024.0))
}

pub fn usage_color(pct: f64) -> Color {
    if pct < 70.0 {
        Color::Green
    } else if pct < 90.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Gauge ratio in `0.0..=1.0` from a percentage that may be out of range.
pub fn ratio(pct: f64) -> f64 {
    if pct.is_finite() {
        (pct / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
