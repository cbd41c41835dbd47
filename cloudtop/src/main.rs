use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use cloudtop::api::{CloudApi, HttpApi, MockApi};
use cloudtop::app::App;
use cloudtop_core::{Runtime, RuntimeConfig};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cloudtop", version, about = "Terminal console for cloud workstations")]
struct Args {
    /// Base URL of the workstation daemon.
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api_url: String,

    /// Run against in-memory sample data instead of a backend.
    #[arg(long)]
    demo: bool,

    /// Append logs to this file. Stderr belongs to the TUI, so without this
    /// flag logging is disabled.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Spinner/animation tick interval in milliseconds.
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

fn init_logging(log_file: &PathBuf) -> io::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    if let Some(log_file) = &args.log_file {
        init_logging(log_file)?;
    }

    let api: Arc<dyn CloudApi> = if args.demo {
        info!("starting in demo mode with sample data");
        Arc::new(MockApi::with_sample_data())
    } else {
        info!(url = %args.api_url, "starting against backend");
        Arc::new(HttpApi::new(args.api_url))
    };

    // Restore the terminal even when a draw or update panics.
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        default_hook(panic_info);
    }));

    let config = RuntimeConfig {
        tick_interval: std::time::Duration::from_millis(args.tick_ms),
        ..RuntimeConfig::default()
    };

    let mut terminal = setup_terminal()?;
    let result = Runtime::new(App::new(api))
        .with_config(config)
        .run(&mut terminal)
        .await;
    restore_terminal();

    info!("console exited");
    result
}
