//! Trendwire CLI - trending AI/ML repositories with LLM summaries
//!
//! The application logic is contained in lib.rs, and this file is responsible
//! for parsing arguments and handling top-level errors.

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use trendwire::{logging, server, AppState, Config, Provider, SummaryRequest};

#[derive(Parser)]
#[command(name = "trendwire")]
#[command(author, version, about = "Trending AI/ML repositories with LLM summaries", long_about = None)]
struct Cli {
    /// Path to a trendwire.toml, instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Address to bind, overrides the config file
        #[arg(long)]
        host: Option<String>,
        /// Port to bind, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },
    /// Fetch and print the current trending list
    Repos,
    /// Summarise text with one provider
    Summarise {
        /// Provider: groq, openai or anthropic
        #[arg(long, default_value = "openai")]
        provider: String,
        /// Text to summarise; read from stdin when omitted
        #[arg(long)]
        text: Option<String>,
        /// API key; defaults to the provider's environment variable
        #[arg(long)]
        credential: Option<String>,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        None => {
            let config = load_config(cli.config.as_deref())?;
            server::run(&config).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            server::run(&config).await?;
        }
        Some(Commands::Repos) => {
            let config = load_config(cli.config.as_deref())?;
            let state = AppState::from_config(&config)?;
            let repos = state.trending.fetch_trending().await?;

            println!("Trending repositories ({}):\n", repos.len());
            for repo in repos {
                println!(
                    "{} {} {}",
                    repo.full_name.bold(),
                    format!("★ {}", repo.stars).yellow(),
                    repo.language.as_deref().unwrap_or("-").dimmed()
                );
                println!("   {}", repo.url);
                println!("   {}\n", repo.description);
            }
        }
        Some(Commands::Summarise {
            provider,
            text,
            credential,
        }) => {
            let provider: Provider = provider.parse()?;
            let credential = match credential {
                Some(credential) => credential,
                None => std::env::var(provider.api_key_env())
                    .with_context(|| format!("set {} or pass --credential", provider.api_key_env()))?,
            };
            let text = match text {
                Some(text) => text,
                None => read_stdin()?,
            };

            let config = load_config(cli.config.as_deref())?;
            let state = AppState::from_config(&config)?;
            let result = state
                .summarizer
                .summarize(&SummaryRequest::new(text, credential, provider))
                .await?;

            println!("{}", result.summary);
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "trendwire",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::load()?,
    };
    Ok(config)
}

fn read_stdin() -> anyhow::Result<String> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        anyhow::bail!("no --text given and nothing piped on stdin");
    }
    let mut text = String::new();
    stdin.read_to_string(&mut text)?;
    Ok(text)
}
