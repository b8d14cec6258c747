//! CPU history chart and current-usage card.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType},
};

use crate::history::CpuHistory;
use crate::types::Metrics;
use crate::ui::util::{ratio, usage_color};

pub fn draw_cpu_chart(f: &mut ratatui::Frame<'_>, area: Rect, hist: &CpuHistory) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("CPU usage (last {} samples)", hist.len()));
    let points = hist.chart_points();
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let dataset = Dataset::default()
        .name("cpu %")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let x_labels = vec![
        Span::raw(hist.first_label().unwrap_or("").to_string()),
        Span::raw(hist.last_label().unwrap_or("").to_string()),
    ];
    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0"), Span::raw("50"), Span::raw("100")]),
        );
    f.render_widget(chart, area);
}

pub fn draw_cpu_card(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&Metrics>) {
    let block = Block::default().borders(Borders::ALL).title("CPU now");
    let Some(mm) = m else {
        f.render_widget(block, area);
        return;
    };
    let pct = f64::from(mm.cpu_percent);
    let g = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(usage_color(pct)))
        .ratio(ratio(pct))
        .label(format!("{pct:.1}%"));
    f.render_widget(g, area);
}
