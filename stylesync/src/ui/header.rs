//! Top header with agent URL, last update time and network totals.

use crate::types::Metrics;
use crate::ui::util::human;
use ratatui::{
    layout::Rect,
    widgets::{Block, Borders},
};

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, url: &str, m: Option<&Metrics>) {
    let title = match m {
        Some(mm) => format!(
            "stylesync | agent: {url} | updated {} | net tx {} rx {}  (press 'q' to quit)",
            mm.clock_label(),
            human(mm.network.bytes_sent),
            human(mm.network.bytes_recv)
        ),
        None => format!("stylesync | connecting to {url}... (press 'q' to quit)"),
    };
    f.render_widget(Block::default().title(title).borders(Borders::BOTTOM), area);
}
