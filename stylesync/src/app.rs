//! App state and main loop: input handling, receiving pushed metrics, updating history, and drawing.

use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use url::Url;

use crate::history::CpuHistory;
use crate::types::Metrics;
use crate::ui::{
    cpu::{draw_cpu_card, draw_cpu_chart},
    disks::draw_disk,
    header::draw_header,
    mem::draw_mem,
};
use crate::ui::util::{gib, human};
use crate::ws::{close, connect, next_metrics, WsStream};

const INPUT_TICK: Duration = Duration::from_millis(100);

pub struct App {
    url: String,
    last_metrics: Option<Metrics>,
    cpu_hist: CpuHistory,
    received: u64,
    // stop after this many snapshots
    limit: Option<u64>,
    should_quit: bool,
}

impl App {
    pub fn new(url: &Url, limit: Option<u64>) -> Self {
        Self {
            url: url.to_string(),
            last_metrics: None,
            cpu_hist: CpuHistory::default(),
            received: 0,
            limit,
            should_quit: false,
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn history(&self) -> &CpuHistory {
        &self.cpu_hist
    }

    pub fn update_with_metrics(&mut self, m: Metrics) {
        self.cpu_hist.push(m.clock_label(), m.cpu_percent);
        self.received += 1;
        if self.limit.is_some_and(|n| self.received >= n) {
            self.should_quit = true;
        }
        self.last_metrics = Some(m);
    }

    pub async fn run(&mut self, url: &Url) -> anyhow::Result<()> {
        // Connect before touching the terminal so errors print normally
        let mut ws = connect(url).await?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, &mut ws).await;

        // Teardown
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        close(&mut ws).await;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        ws: &mut WsStream,
    ) -> anyhow::Result<()> {
        let mut tick = tokio::time::interval(INPUT_TICK);
        terminal.draw(|f| self.draw(f))?;
        loop {
            tokio::select! {
                msg = next_metrics(ws) => match msg? {
                    Some(m) => self.update_with_metrics(m),
                    None => anyhow::bail!("agent closed the stream"),
                },
                _ = tick.tick() => self.handle_input()?,
            }
            if self.should_quit {
                return Ok(());
            }
            terminal.draw(|f| self.draw(f))?;
        }
    }

    fn handle_input(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(k) = event::read()? {
                if k.kind == KeyEventKind::Press
                    && matches!(k.code, KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc)
                {
                    self.should_quit = true;
                }
            }
        }
        Ok(())
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // header, chart, cards
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        draw_header(f, rows[0], &self.url, self.last_metrics.as_ref());
        draw_cpu_chart(f, rows[1], &self.cpu_hist);

        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(rows[2]);
        draw_cpu_card(f, cards[0], self.last_metrics.as_ref());
        draw_mem(f, cards[1], self.last_metrics.as_ref());
        draw_disk(f, rows[3], self.last_metrics.as_ref());
    }
}

/// One line per snapshot for `--plain` output.
pub fn summary_line(m: &Metrics) -> String {
    format!(
        "{} cpu {:5.1}% | mem {:5.1}% ({} / {}) | disk {:5.1}% ({} / {}) | net tx {} rx {}",
        m.clock_label(),
        m.cpu_percent,
        m.memory.percent,
        gib(m.memory.used),
        gib(m.memory.total),
        m.disk.percent,
        gib(m.disk.used),
        gib(m.disk.total),
        human(m.network.bytes_sent),
        human(m.network.bytes_recv),
    )
}

/// Prints a summary line per pushed snapshot until the stream ends or `limit` is reached.
pub async fn run_plain(url: &Url, limit: Option<u64>) -> anyhow::Result<()> {
    let mut ws = connect(url).await?;
    let mut seen = 0u64;
    while limit.map_or(true, |n| seen < n) {
        match next_metrics(&mut ws).await? {
            Some(m) => println!("{}", summary_line(&m)),
            None => break,
        }
        seen += 1;
    }
    close(&mut ws).await;
    Ok(())
}
