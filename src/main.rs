// Entrypoint for the uploader.
// - Keeps `main` small: parse flags, set up logging, build the API
//   client and the session, then hand everything to the UI loop.
// - Returns `anyhow::Result`; only startup problems and terminal I/O
//   errors end the program.

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use telegram_uploader::api::{ApiClient, DEFAULT_API_URL};
use telegram_uploader::config::{default_config_path, UploadConfig};
use telegram_uploader::session::Session;
use telegram_uploader::ui::App;

#[derive(Parser, Debug)]
#[command(
    name = "tg-uploader",
    version,
    about = "Browse local files and upload them to Telegram chats through a bot"
)]
struct Cli {
    /// Bot token from @BotFather
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Path to the JSON settings file [default: ~/.telegram_uploader_config.json]
    #[arg(long, short = 'c', env = "TELEGRAM_UPLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Directory to start browsing in [default: current directory]
    #[arg(long)]
    start_dir: Option<PathBuf>,

    /// Log file; stderr is used if it cannot be opened
    #[arg(long, default_value = "telegram_uploader.log")]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Bot API server
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file, &cli.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tg-uploader starting");

    let token = cli.token.unwrap_or_default();
    let client = ApiClient::with_api_url(&token, &cli.api_url)
        .context("set TELEGRAM_BOT_TOKEN or pass --token")?;

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let config = UploadConfig::load_or_init(&config_path);

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    let start = match cli.start_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("reading the current directory")?,
    };
    let session = Session::new(&start, home);

    App::new(client, config, session).run()?;
    tracing::info!("tg-uploader exiting");
    Ok(())
}

/// Log to `path` without colors. The screen belongs to the UI, so stderr
/// is only a fallback.
fn init_logging(path: &Path, level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(err) => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            tracing::warn!("cannot open log file {}: {err}", path.display());
        }
    }
}
