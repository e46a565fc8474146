//! Spectra UI (spectra-ui) - Main entry point
//!
//! Connects one view (analyzer or downloader) to its Socket.IO namespace and
//! drives it from commands typed on stdin. The view is printed to stdout
//! after every step; logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spectra_common::config::{ClientConfig, ConfigOverrides};
use spectra_common::cookies::CookieJar;
use spectra_common::packet::EngineIoVersion;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use spectra_ui::commands::{AnalyzerCommands, CommandParser, DownloaderCommands, Input};
use spectra_ui::images::ImageSink;
use spectra_ui::render::{Render, TerminalPresenter};
use spectra_ui::view::{AnalyzerView, DownloaderView, ViewController};
use spectra_ui::{run_session, Channel, SessionEnd};

/// Command-line arguments for spectra-ui
#[derive(Parser, Debug)]
#[command(name = "spectra-ui")]
#[command(about = "Terminal client for the spectra analyzer and downloader")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    view: ViewKind,

    /// Base URL of the server
    #[arg(long, env = "SPECTRA_SERVER_URL")]
    server_url: Option<String>,

    /// Configuration file (TOML)
    #[arg(long, env = "SPECTRA_CONFIG")]
    config: Option<PathBuf>,

    /// Directory receiving the analyzer plots
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// File holding persisted cookies
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Engine.IO protocol revision (3 or 4)
    #[arg(long, value_parser = parse_engine_io)]
    engine_io: Option<EngineIoVersion>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ViewKind {
    /// Browse the server file system and analyze spectra
    Analyzer,
    /// Parse a VOTABLE and download the spectra it lists
    Downloader,
}

fn parse_engine_io(value: &str) -> std::result::Result<EngineIoVersion, String> {
    let revision: u8 = value
        .parse()
        .map_err(|_| format!("'{}' is not a revision number", value))?;
    EngineIoVersion::try_from(revision)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Filter is replaced by the configured level once configuration is known
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "spectra-ui {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let overrides = ConfigOverrides {
        server_url: args.server_url.clone(),
        config_file: args.config.clone(),
        images_dir: args.images_dir.clone(),
        state_file: args.state_file.clone(),
        engine_io: args.engine_io,
    };
    let config = ClientConfig::resolve(&overrides).context("Failed to resolve configuration")?;
    if std::env::var_os("RUST_LOG").is_none() {
        filter_handle
            .reload(EnvFilter::new(&config.log_level))
            .context("Failed to apply log level")?;
    }
    info!("Server: {} (Engine.IO {})", config.server_url, config.engine_io.as_u8());

    let cookies = CookieJar::load(&config.state_file);

    let end = match args.view {
        ViewKind::Analyzer => {
            let images = ImageSink::new(config.images_dir.clone());
            info!("Plots are written to {}", images.dir().display());
            run_view::<_, AnalyzerCommands>(
                AnalyzerView::new(),
                &config,
                cookies.header_value(),
                Some(images),
            )
            .await?
        }
        ViewKind::Downloader => {
            let header = cookies.header_value();
            run_view::<_, DownloaderCommands>(
                DownloaderView::new(cookies),
                &config,
                header,
                None,
            )
            .await?
        }
    };

    match end {
        SessionEnd::Disconnected(reason) => anyhow::bail!("Session ended: {}", reason),
        SessionEnd::InputClosed => {
            info!("Bye");
            Ok(())
        }
    }
}

async fn run_view<C, P>(
    controller: C,
    config: &ClientConfig,
    cookie_header: Option<String>,
    images: Option<ImageSink>,
) -> Result<SessionEnd>
where
    C: ViewController + Render,
    P: CommandParser<Command = C::Command> + 'static,
    C::Command: Send + 'static,
{
    let channel = Channel::connect(config, C::NAMESPACE, cookie_header.as_deref())
        .await
        .with_context(|| format!("Failed to join {}", C::NAMESPACE))?;

    let (tx, rx) = mpsc::channel(16);
    let input = tokio::spawn(read_commands::<P>(tx));
    println!("{}", P::help());

    let presenter = TerminalPresenter::new(std::io::stdout(), images);
    let (_controller, _presenter, end) = run_session(controller, channel, rx, presenter).await;
    input.abort();
    Ok(end)
}

/// Forward parsed stdin lines until EOF or `quit`
async fn read_commands<P>(commands: mpsc::Sender<P::Command>)
where
    P: CommandParser + 'static,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Cannot read stdin: {}", e);
                break;
            }
        };
        match P::parse(&line) {
            Ok(Input::Command(command)) => {
                if commands.send(command).await.is_err() {
                    break;
                }
            }
            Ok(Input::Help(text)) => println!("{}", text),
            Ok(Input::Quit) => break,
            Ok(Input::Empty) => {}
            Err(e) => println!("!! {}", e),
        }
    }
}
