//! `seerr` command line front end.
//!
//! Thin shell over the runtime aggregator: every command probes, acts, and
//! prints from the resulting state snapshot.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use seerr_api::client::SeerrClient;
use seerr_api::traits::DiscoverCategory;
use seerr_api::types::SearchResult;
use seerr_core::resolver::RemoteMode;
use seerr_core::settings::Settings;
use seerr_runtime::connection::ConnectionStatus;
use seerr_runtime::request::RequestStatus;
use seerr_runtime::search::SearchStatus;
use seerr_runtime::{Runtime, SettingsCookies};

#[derive(Parser)]
#[command(name = "seerr", version, about = "Remote control for a Seerr request server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the configured endpoints and report which one answers.
    Status,
    /// Sign in with email/password and store the session cookie.
    Login {
        email: String,
        password: String,
        /// Server to log into; defaults to the resolved endpoint.
        #[arg(long)]
        url: Option<String>,
    },
    /// Clear the stored session.
    Logout,
    /// Search the catalog.
    Search { query: String },
    /// Browse a discovery shelf.
    Discover {
        #[arg(value_enum, default_value = "trending")]
        category: Shelf,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Search and request one of the matches.
    Request {
        query: String,
        /// Zero-based index into the search results.
        #[arg(long, default_value_t = 0)]
        pick: usize,
    },
    /// Show or change endpoint settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Shelf {
    Trending,
    Movies,
    Tv,
}

impl From<Shelf> for DiscoverCategory {
    fn from(shelf: Shelf) -> Self {
        match shelf {
            Shelf::Trending => Self::Trending,
            Shelf::Movies => Self::Movies,
            Shelf::Tv => Self::Tv,
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current endpoint settings.
    Show,
    /// Change one setting.
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ConfigKey {
    LocalUrl,
    RemoteEnabled,
    RemoteMode,
    TunnelId,
    CustomRemoteUrl,
    PreferLocalFirst,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seerr=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let settings = Settings::open_default().map_err(|e| e.to_string())?;
    let api = SeerrClient::new(Arc::new(SettingsCookies(settings.clone())))
        .map_err(|e| e.to_string())?;
    let rt = Runtime::new(api, settings);

    match cli.command {
        Command::Status => {
            rt.refresh_connection().await;
            let connection = rt.state().connection;
            match connection.status {
                ConnectionStatus::Connected => {
                    println!("connected: {}", connection.base_url_in_use);
                    println!("authenticated: {}", rt.is_authenticated());
                    if !connection.fallback_note.is_empty() {
                        println!("{}", connection.fallback_note);
                    }
                    Ok(())
                }
                _ => Err(format!("disconnected: {}", connection.last_error)),
            }
        }
        Command::Login {
            email,
            password,
            url,
        } => {
            let base = url.unwrap_or_else(|| rt.preferred_login_base_url());
            rt.login(&base, &email, &password)
                .await
                .map_err(|e| e.to_string())?;
            println!("logged in to {base}");
            Ok(())
        }
        Command::Logout => {
            rt.logout().await;
            println!("logged out");
            Ok(())
        }
        Command::Search { query } => {
            rt.refresh_connection().await;
            let session = rt.search_now(&query).await;
            match session.status {
                SearchStatus::HasResults => {
                    print_items(&session.results);
                    Ok(())
                }
                SearchStatus::Empty => {
                    println!("no results for \"{}\"", session.query);
                    Ok(())
                }
                SearchStatus::Idle => Err("query too short".to_string()),
                _ => Err(session.error),
            }
        }
        Command::Discover { category, page } => {
            rt.refresh_connection().await;
            let category: DiscoverCategory = category.into();
            let shelf = rt
                .discover(category, page)
                .await
                .map_err(|e| e.to_string())?;
            println!("{} (page {page})", category.label());
            print_items(&shelf.items);
            if shelf.has_next {
                println!("(more on page {})", page + 1);
            }
            Ok(())
        }
        Command::Request { query, pick } => {
            rt.refresh_connection().await;
            let session = rt.search_now(&query).await;
            if session.status != SearchStatus::HasResults {
                return Err(if session.error.is_empty() {
                    format!("no results for \"{query}\"")
                } else {
                    session.error
                });
            }
            let target = session.results.get(pick).cloned().ok_or_else(|| {
                format!(
                    "only {} result(s), index {pick} is out of range",
                    session.results.len()
                )
            })?;
            println!("requesting {} ({})", target.title, target.media_type);
            rt.submit_request(target).await;
            let attempt = rt
                .state()
                .request
                .ok_or_else(|| "request attempt missing".to_string())?;
            match attempt.status {
                RequestStatus::Success => {
                    println!("requested {}", attempt.target.title);
                    Ok(())
                }
                _ => Err(attempt.error),
            }
        }
        Command::Config { command } => config(&rt, command),
    }
}

fn config(rt: &Arc<Runtime<SeerrClient>>, command: ConfigCommand) -> Result<(), String> {
    match command {
        ConfigCommand::Show => {
            let state = rt.state();
            let c = &state.endpoints;
            println!("local-url: {}", c.local_url);
            println!("remote-enabled: {}", c.remote_enabled);
            println!("remote-mode: {}", c.remote_mode.as_str());
            println!("tunnel-id: {}", c.tunnel_id);
            println!("custom-remote-url: {}", c.custom_remote_url);
            println!("prefer-local-first: {}", c.prefer_local_first);
            if !state.derived_remote_url.is_empty() {
                println!("resolved remote url: {}", state.derived_remote_url);
            }
        }
        ConfigCommand::Set { key, value } => match key {
            ConfigKey::LocalUrl => rt.set_local_url(&value),
            ConfigKey::RemoteEnabled => rt.set_remote_enabled(parse_bool(&value)?),
            ConfigKey::RemoteMode => rt.set_remote_mode(match value.as_str() {
                "tunnel" => RemoteMode::Tunnel,
                "custom" => RemoteMode::Custom,
                other => return Err(format!("expected tunnel or custom, got {other}")),
            }),
            ConfigKey::TunnelId => rt.set_tunnel_id(&value),
            ConfigKey::CustomRemoteUrl => rt.set_custom_remote_url(&value),
            ConfigKey::PreferLocalFirst => rt.set_prefer_local_first(parse_bool(&value)?),
        },
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    value
        .parse::<bool>()
        .map_err(|_| format!("expected true or false, got {value}"))
}

fn print_items(items: &[SearchResult]) {
    for item in items {
        let year = if item.year.is_empty() {
            String::new()
        } else {
            format!(" ({})", item.year)
        };
        println!(
            "{:>8}  {:<5}  {:<10}  {}{year}",
            item.tmdb_id,
            item.media_type.as_str(),
            item.availability.label(),
            item.title
        );
    }
}
