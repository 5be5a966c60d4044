use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::mpsc;

use headlines::app::{create_client, App, AppEvent};
use headlines::config::{default_config_path, Config};
use headlines::feed::{load_feed, FeedFetcher};
use headlines::gemini::{self, GeminiError};
use headlines::ui;

#[derive(Parser, Debug)]
#[command(name = "headlines", about = "Terminal RSS headline viewer", version)]
struct Args {
    /// Feed URL (overrides feed_url in the config file)
    #[arg(long, global = true, value_name = "URL")]
    url: Option<String>,

    /// Proxy endpoint (overrides proxy_url in the config file)
    #[arg(long, global = true, value_name = "URL")]
    proxy: Option<String>,

    /// Config file path (default: ~/.config/headlines/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the feed once and print it as JSON
    Dump,
    /// Send one prompt to the generative-language API and print the reply
    Ask {
        /// Prompt text (default from config)
        prompt: Option<String>,
        /// System instruction (default from config)
        #[arg(long)]
        system: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for `dump` and `ask`
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(url) = args.url {
        config.feed_url = url;
    }
    if let Some(proxy) = args.proxy {
        config.proxy_url = proxy;
    }
    tracing::debug!(?config, "Effective configuration");

    let client = create_client().context("Failed to build HTTP client")?;

    match args.command {
        None => run_tui(client, &config).await,
        Some(Command::Dump) => dump(client, &config).await,
        Some(Command::Ask { prompt, system }) => ask(client, config, prompt, system).await,
    }
}

async fn run_tui(client: reqwest::Client, config: &Config) -> Result<()> {
    let fetcher =
        FeedFetcher::new(client, &config.proxy_url).context("Invalid proxy configuration")?;
    let mut app = App::new(fetcher, config.feed_url.clone());

    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(8);
    ui::run(&mut app, event_tx, event_rx).await
}

async fn dump(client: reqwest::Client, config: &Config) -> Result<()> {
    let fetcher =
        FeedFetcher::new(client, &config.proxy_url).context("Invalid proxy configuration")?;

    let result = load_feed(&fetcher, &config.feed_url)
        .await
        .with_context(|| format!("An error occurred while parsing the feed {}", config.feed_url))?;

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize feed")?;
    println!("{}", json);
    Ok(())
}

async fn ask(
    client: reqwest::Client,
    mut config: Config,
    prompt: Option<String>,
    system: Option<String>,
) -> Result<()> {
    if let Some(system) = system {
        config.gemini.system_instruction = system;
    }
    let prompt = prompt.unwrap_or_else(|| config.gemini.prompt.clone());

    let api_key = gemini::resolve_api_key(&config.gemini).ok_or(GeminiError::MissingApiKey)?;
    let text = gemini::generate(&client, &config.gemini, &api_key, &prompt).await?;
    println!("{}", text);
    Ok(())
}
