//! Command-line front end.

use crate::api::ApiClient;
use crate::config::{self, Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Client for the Telegram chat scraping and Q&A backend
#[derive(Parser, Debug)]
#[command(name = "chatbot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Backend base URL (overrides config file and CHATBOT_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Api(ApiCommand),
    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Commands that talk to the backend.
#[derive(Subcommand, Debug)]
pub enum ApiCommand {
    /// List chats visible to the backend
    Chats,
    /// Show stored messages of a chat
    Messages {
        chat_id: i64,
    },
    /// Send a message to a chat
    Send {
        chat_id: i64,
        text: String,
    },
    /// Scrape recent messages of a chat into the backend store
    Scrape {
        chat_id: i64,
        /// Number of messages to fetch (default from config)
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Show the summary of a chat
    Summary {
        chat_id: i64,
    },
    /// Ask a question and stream the answer (use "-" to read from stdin)
    Chat {
        query: String,
    },
    /// List knowledge base sources
    Sources,
    /// Show backend statistics
    Stats,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show config file path
    Path,
    /// Show the resolved configuration
    Show,
}

impl Cli {
    /// Resolve the effective config from file, environment and flags.
    ///
    /// Precedence (highest to lowest):
    /// 1. `--base-url`
    /// 2. `CHATBOT_API_BASE`
    /// 3. Config file
    /// 4. Built-in defaults
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Config::load_from(path)?
            }
            None => Config::load()?,
        };

        if let Some(url) = &self.base_url {
            config.base_url.clone_from(url);
        }
        Ok(config)
    }

    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> ExitCode {
    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    let resolved = cli.resolve_config();

    match cli.command {
        Commands::Config {
            action: ConfigAction::Path,
        } => {
            println!("{}", config_path.display());
            Ok(())
        }
        Commands::Config {
            action: ConfigAction::Show,
        } => {
            print!("{}", toml::to_string_pretty(&resolved?)?);
            Ok(())
        }
        Commands::Api(command) => {
            config::init(resolved?);
            let client = ApiClient::from_global()?;
            tracing::debug!(base_url = client.base_url(), "Using backend");
            run_command(&client, command).await
        }
    }
}

async fn run_command(client: &ApiClient, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Chats => print_json(&client.list_chats().await?),
        ApiCommand::Messages { chat_id } => print_json(
            &client
                .list_messages(chat_id)
                .await
                .with_context(|| format!("Failed to fetch messages for chat {chat_id}"))?,
        ),
        ApiCommand::Send { chat_id, text } => print_json(
            &client
                .send_message(chat_id, &text)
                .await
                .with_context(|| format!("Failed to send message to chat {chat_id}"))?,
        ),
        ApiCommand::Scrape { chat_id, limit } => {
            let report = client
                .scrape_chat(chat_id, limit)
                .await
                .context("Scraping failed")?;
            print_json(&report)?;
            if !report.is_success() {
                anyhow::bail!(
                    "Backend could not scrape chat {chat_id}: {}",
                    report.detail.as_deref().unwrap_or("no detail")
                );
            }
            Ok(())
        }
        ApiCommand::Summary { chat_id } => print_json(
            &client
                .fetch_summary(chat_id)
                .await
                .context("Failed to fetch summary")?,
        ),
        ApiCommand::Chat { query } => run_chat(client, &read_query(query)?).await,
        ApiCommand::Sources => print_json(&client.list_sources().await?),
        ApiCommand::Stats => print_json(&client.admin_stats().await?),
    }
}

/// Stream an answer to stdout until the backend finishes or Ctrl-C.
async fn run_chat(client: &ApiClient, query: &str) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = stream_to(client, query, &cancel, &mut io::stdout().lock()).await;
    ctrl_c.abort();
    result
}

/// Write streamed fragments to `out` as they arrive.
///
/// A trailing newline is added only after at least one fragment was written.
async fn stream_to<W: Write>(
    client: &ApiClient,
    query: &str,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<()> {
    let mut wrote_any = false;
    let mut write_err = None;
    let result = client
        .stream_chat_until(query, cancel, |chunk| {
            if write_err.is_some() {
                return;
            }
            match out.write_all(chunk.as_bytes()).and_then(|()| out.flush()) {
                Ok(()) => wrote_any = true,
                Err(e) => {
                    write_err = Some(e);
                    cancel.cancel();
                }
            }
        })
        .await;

    if let Some(e) = write_err {
        return Err(e).context("Failed to write to stdout");
    }
    if wrote_any {
        writeln!(out)?;
    }

    match result {
        Ok(()) => Ok(()),
        Err(crate::Error::Cancelled) => anyhow::bail!("Interrupted"),
        Err(e) => Err(e).context("Chat request failed"),
    }
}

fn read_query(query: String) -> Result<String> {
    let query = if query == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer.trim().to_string()
    } else {
        query
    };

    if query.trim().is_empty() {
        anyhow::bail!("Empty query");
    }
    Ok(query)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scrape_with_limit() {
        let cli = Cli::try_parse_from(["chatbot", "scrape", "42", "--limit", "50"]).unwrap();
        match cli.command {
            Commands::Api(ApiCommand::Scrape { chat_id, limit }) => {
                assert_eq!(chat_id, 42);
                assert_eq!(limit, Some(50));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_negative_chat_id() {
        let cli = Cli::try_parse_from(["chatbot", "summary", "--", "-1001234"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Api(ApiCommand::Summary { chat_id: -1_001_234 })
        ));
    }

    #[test]
    fn test_base_url_flag_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://from-file:8000\"\nscrape_limit = 7\n").unwrap();

        let cli = Cli::try_parse_from([
            "chatbot",
            "--config",
            path.to_str().unwrap(),
            "--base-url",
            "http://from-flag:9000",
            "sources",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.base_url, "http://from-flag:9000");
        assert_eq!(config.scrape_limit, 7);
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let cli = Cli::try_parse_from(["chatbot", "--config", "/nonexistent/chatbot.toml", "stats"])
            .unwrap();
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(read_query("   ".to_string()).is_err());
        assert_eq!(read_query("hello".to_string()).unwrap(), "hello");
    }

    async fn chat_server(status: u16, body: &str) -> (wiremock::MockServer, ApiClient) {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        let client = ApiClient::new(&server.uri()).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn test_stream_to_ends_output_with_newline() {
        let (_server, client) = chat_server(200, "answer").await;
        let mut out = Vec::new();
        stream_to(&client, "q", &CancellationToken::new(), &mut out)
            .await
            .unwrap();
        assert_eq!(out, b"answer\n");
    }

    #[tokio::test]
    async fn test_stream_to_failed_request_writes_nothing() {
        let (_server, client) = chat_server(503, "model unavailable").await;
        let mut out = Vec::new();
        let err = stream_to(&client, "q", &CancellationToken::new(), &mut out)
            .await
            .unwrap_err();
        assert!(out.is_empty());
        assert!(format!("{err:#}").contains("503"));
    }

    #[tokio::test]
    async fn test_stream_to_interrupted_is_error() {
        let (_server, client) = chat_server(200, "unused").await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();
        let err = stream_to(&client, "q", &cancel, &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Interrupted");
        assert!(out.is_empty());
    }
}
