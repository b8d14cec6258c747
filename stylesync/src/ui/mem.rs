//! Memory card.

use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, Gauge},
};

use crate::types::Metrics;
use crate::ui::util::{gib, ratio, usage_color};

pub fn draw_mem(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&Metrics>) {
    let block = Block::default().borders(Borders::ALL).title("Memory");
    let Some(mm) = m else {
        f.render_widget(block, area);
        return;
    };
    let pct = f64::from(mm.memory.percent);
    let g = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(usage_color(pct)))
        .ratio(ratio(pct))
        .label(format!(
            "{pct:.1}%  {} used / {} total, {} available",
            gib(mm.memory.used),
            gib(mm.memory.total),
            gib(mm.memory.available)
        ));
    f.render_widget(g, area);
}
