//! Disk card for the agent's watched mount.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
};

use crate::types::Metrics;
use crate::ui::util::{gib, ratio, usage_color};

pub fn draw_disk(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&Metrics>) {
    let block = Block::default().borders(Borders::ALL).title("Disk");
    let Some(mm) = m else {
        f.render_widget(block, area);
        return;
    };
    let pct = f64::from(mm.disk.percent);
    let g = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(usage_color(pct)))
        .ratio(ratio(pct))
        .label(format!(
            "{pct:.1}%  {} used / {} total, {} free",
            gib(mm.disk.used),
            gib(mm.disk.total),
            gib(mm.disk.free)
        ));
    f.render_widget(g, area);
}
