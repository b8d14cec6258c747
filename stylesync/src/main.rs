//! Entry point for the stylesync TUI. Parses args and runs the App.

use clap::Parser;

use stylesync::app::{run_plain, App};
use stylesync::ws::{parse_url, DEFAULT_URL};

/// Live dashboard for a StyleSync agent's metrics stream.
#[derive(Debug, Parser)]
#[command(name = "stylesync", version, about)]
struct Args {
    /// Agent stream URL
    #[arg(default_value = DEFAULT_URL)]
    url: String,

    /// Print one summary line per snapshot instead of the dashboard
    #[arg(long)]
    plain: bool,

    /// Exit after this many snapshots
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = parse_url(&args.url)?;

    if args.plain {
        return run_plain(&url, args.count).await;
    }
    let mut app = App::new(&url, args.count);
    app.run(&url).await
}
