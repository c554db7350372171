//! novella - command-line client for the novel analysis service.
//!
//! Every command restores the session from the stored token first, then
//! talks to the API through the same authenticated pipeline.

mod cli;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use novella_core::models::{
    AnalysisReport, Character, LoginRequest, ProfileUpdate, RegisterRequest, TextSource, Upload,
    Work, WorkQuery, WorkUpload, World,
};
use novella_core::{ApiClient, Config, SessionManager, SessionState};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{AnalyzeArgs, Cli, Command, ConfigCommand, RecordCommand, WorksCommand};

// ============================================================================
// Constants
// ============================================================================

const PASSWORD_ENV: &str = "NOVELLA_PASSWORD";

/// Maximum title width in work listings
const TITLE_WIDTH: usize = 40;

/// Initialize the tracing subscriber for logging.
/// The returned guard must live until exit so file logs are flushed.
fn init_tracing(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let saved = Config::load().context("Failed to load configuration")?;

    // Config commands edit the saved file and never touch the network
    let command = match cli.command {
        Command::Config(command) => return run_config(command, saved),
        other => other,
    };

    let mut config = saved;
    config.apply_env()?;
    if let Some(ref base) = cli.base_url {
        config.base_address = base.clone();
    }
    debug!(base = %config.base_address, storage = %config.token_storage, "Configuration loaded");

    let store = Arc::new(config.credential_store()?);
    let api = ApiClient::new(&config, store)?;
    let session = SessionManager::new(api);
    let state = session.bootstrap().await;
    info!(?state, "Session ready");

    match command {
        Command::Login { username } => login(&session, &config, username).await,
        Command::Register { username, email } => register(&session, username, email).await,
        Command::Logout => {
            session.logout();
            eprintln!("Logged out.");
            Ok(())
        }
        Command::Whoami => {
            require_login(&session)?;
            print_json(&session.profile())
        }
        Command::Profile { nickname, email } => {
            require_login(&session)?;
            let update = ProfileUpdate { nickname, email };
            if update.is_empty() {
                anyhow::bail!("Nothing to change: pass --nickname or --email");
            }
            print_json(&session.update_profile(&update).await?)
        }
        Command::Status => {
            print_status(&session, &config);
            Ok(())
        }
        Command::Works(command) => {
            require_login(&session)?;
            run_works(&session, command).await
        }
        Command::Analyze(args) => {
            require_login(&session)?;
            analyze(&session, args).await
        }
        Command::Characters(command) => {
            require_login(&session)?;
            match command {
                RecordCommand::List => {
                    let characters: Vec<Character> = session.api().list_characters().await?;
                    print_json(&characters)
                }
                RecordCommand::Remove { id } => {
                    print_json(&session.api().remove_character(id).await?)
                }
            }
        }
        Command::Worlds(command) => {
            require_login(&session)?;
            match command {
                RecordCommand::List => {
                    let worlds: Vec<World> = session.api().list_worlds().await?;
                    print_json(&worlds)
                }
                RecordCommand::Remove { id } => print_json(&session.api().remove_world(id).await?),
            }
        }
        Command::Config(_) => Ok(()), // handled above
    }
}

fn require_login(session: &SessionManager) -> Result<()> {
    if session.state() != SessionState::Authenticated {
        anyhow::bail!("Not logged in. Run `novella login` first.");
    }
    Ok(())
}

fn prompt_username() -> Result<String> {
    eprint!("Username: ");
    io::stderr().flush()?;
    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    Ok(username.trim().to_string())
}

fn prompt_password() -> Result<String> {
    match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => Ok(password),
        _ => rpassword::prompt_password("Password: ").context("Failed to read password"),
    }
}

async fn login(session: &SessionManager, config: &Config, username: Option<String>) -> Result<()> {
    let username = match username.or_else(|| config.last_username.clone()) {
        Some(username) if !username.trim().is_empty() => username,
        _ => prompt_username()?,
    };
    if username.is_empty() {
        anyhow::bail!("Username required");
    }
    let password = prompt_password()?;

    let profile = session.login(&LoginRequest::new(username.clone(), password)).await?;
    remember_username(username);
    eprintln!("Logged in as {}.", profile.display_name());
    Ok(())
}

async fn register(session: &SessionManager, username: String, email: Option<String>) -> Result<()> {
    let password = prompt_password()?;
    let mut request = RegisterRequest::new(username.clone(), password);
    if let Some(email) = email {
        request = request.with_email(email);
    }

    let profile = session.register(&request).await?;
    remember_username(username);
    eprintln!("Registered and logged in as {}.", profile.display_name());
    Ok(())
}

/// Record the username in the saved config, leaving overrides out of it.
fn remember_username(username: String) {
    let result = Config::load().and_then(|mut saved| {
        saved.last_username = Some(username);
        saved.save()
    });
    if let Err(e) = result {
        warn!(error = %e, "Failed to save config");
    }
}

fn print_status(session: &SessionManager, config: &Config) {
    let state = match session.state() {
        SessionState::Anonymous => "logged out",
        SessionState::Authenticating => "logging in",
        SessionState::Authenticated => "logged in",
        SessionState::Bootstrapping => "restoring session",
    };
    println!("Server:  {}", config.base_address);
    println!("Storage: {}", config.token_storage);
    println!("Session: {}", state);
    if let Some(profile) = session.profile() {
        println!("User:    {}", profile.display_name());
    }
}

async fn run_works(session: &SessionManager, command: WorksCommand) -> Result<()> {
    let api = session.api();
    match command {
        WorksCommand::List { keyword, category, status, page, size } => {
            let query = WorkQuery { keyword, category, status, page, size };
            let works = api.list_works(&query).await?;
            print_works(&works);
            Ok(())
        }
        WorksCommand::Show { id } => print_json(&api.fetch_work(id).await?),
        WorksCommand::Upload { title, file, content } => {
            let mut upload = match (file, content) {
                (Some(path), _) => WorkUpload::from_file(Upload::from_path(&path)?),
                (None, Some(content)) if !content.is_empty() => WorkUpload {
                    content: Some(content),
                    ..WorkUpload::default()
                },
                _ => anyhow::bail!("Nothing to upload: pass --file or --content"),
            };
            if let Some(title) = title {
                upload = upload.with_title(title);
            }
            print_json(&api.upload_work(upload).await?)
        }
        WorksCommand::Delete { id } => print_json(&api.delete_work(id).await?),
        WorksCommand::Reanalyze { id } => print_json(&api.reanalyze_work(id).await?),
    }
}

async fn analyze(session: &SessionManager, args: AnalyzeArgs) -> Result<()> {
    let source = match (args.file, args.text) {
        (Some(path), _) => TextSource::File(Upload::from_path(&path)?),
        (None, Some(text)) => TextSource::Text(text),
        (None, None) => anyhow::bail!("Pass a file or --text"),
    };
    let report = session.api().analyze_text(source).await?;
    match args.top {
        Some(limit) => {
            print_keywords(&report, limit);
            Ok(())
        }
        None => print_json(&report),
    }
}

fn print_keywords(report: &AnalysisReport, limit: usize) {
    let keywords = report.top_keywords(limit);
    if keywords.is_empty() {
        println!("No keywords.");
    }
    for keyword in keywords {
        println!("{:>6.2}  {}", keyword.weight, keyword.word);
    }
}

fn run_config(command: ConfigCommand, mut config: Config) -> Result<()> {
    match command {
        ConfigCommand::Show => return print_json(&config),
        ConfigCommand::SetBase { url } => config.base_address = url,
        ConfigCommand::SetTimeout { ms } => config.timeout_ms = ms,
        ConfigCommand::SetStorage { kind } => config.token_storage = kind.parse()?,
    }
    config.save().context("Failed to save configuration")?;
    eprintln!("Saved {}", Config::config_path()?.display());
    Ok(())
}

fn print_works(works: &[Work]) {
    if works.is_empty() {
        println!("No works.");
        return;
    }
    for work in works {
        println!(
            "{:>6}  {:<width$}  {}",
            work.id,
            truncate(&work.title, TITLE_WIDTH),
            work.display_status(),
            width = TITLE_WIDTH
        );
    }
}

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("《星环猎手》· 第十二章", 6), "《星环...");
        assert_eq!(truncate("abcdef", 3), "abc");
    }
}
