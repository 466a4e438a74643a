//! Elidune Portal - terminal front-end
//!
//! Renders the admin health dashboard and lets an operator refresh it, run
//! admin actions, and try patron borrow flows against a live API.

use std::{io::IsTerminal, sync::Arc};

use anyhow::Context;
use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::Mutex,
};
use tokio_stream::StreamExt;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use elidune_portal::{
    config::{AppConfig, LoggingConfig},
    models::{format_storage_size, AdminAction, BookId},
    services::{
        credentials::{CredentialSource, NoPrompt, TerminalPrompt},
        health::{ActionOutcome, Confirm, HealthView, MonitorPhase},
    },
    AppError, ErrorKind, Services,
};

type Input = Arc<Mutex<Lines<BufReader<Stdin>>>>;

/// Asks on stdin, sharing the command loop's reader
struct TerminalConfirm {
    input: Input,
}

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, message: &str) -> bool {
        println!("{} [y/N]", message);
        match self.input.lock().await.next_line().await {
            Ok(Some(answer)) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging);

    tracing::info!("Starting Elidune Portal v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Using API at {}", config.api.base_url);

    // Piped input cannot answer a hidden prompt
    let services = if std::io::stdin().is_terminal() {
        Services::new(&config, TerminalPrompt)?
    } else {
        Services::new(&config, NoPrompt)?
    };
    let monitor = services.health.clone();

    // Re-render on every state change
    let mut updates = monitor.updates();
    let renderer = tokio::spawn(async move {
        while let Some(view) = updates.next().await {
            render(&view);
        }
    });

    if let Err(e) = monitor.load().await {
        tracing::warn!("Initial health load failed: {}", e);
    }
    let auto_refresh = monitor.spawn_auto_refresh(config.health.refresh_interval());

    let input: Input = Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()));
    let confirm = TerminalConfirm { input: input.clone() };
    print_help();

    loop {
        let line = match input.lock().await.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => continue,
            ["q" | "quit"] => break,
            ["h" | "help"] => print_help(),
            ["r" | "refresh"] => {
                if let Err(e) = monitor.refresh().await {
                    println!("Refresh failed: {}", error_copy(&e));
                    if e.is_retryable() {
                        println!("Type `refresh` to try again.");
                    }
                }
            }
            ["logout"] => {
                services.credentials.invalidate();
                // the next prompt belongs to a command, not a background tick
                monitor.suspend_auto_refresh();
            }
            ["pending", user, book] => match parse_pair(user, book) {
                Some((user_id, book_id)) => {
                    let pending = services.borrow.has_pending_request(Some(user_id), book_id).await;
                    println!("Pending request: {}", if pending { "yes" } else { "no" });
                }
                None => println!("Usage: pending <user-uuid> <book-id>"),
            },
            ["borrow", user, book] => match parse_pair(user, book) {
                Some((user_id, book_id)) => {
                    match services.borrow.submit_borrow_request(Some(user_id), book_id).await {
                        Ok(()) => println!("Borrow request submitted, awaiting approval."),
                        Err(e) => println!("Borrow request failed: {}", error_copy(&e)),
                    }
                }
                None => println!("Usage: borrow <user-uuid> <book-id>"),
            },
            ["waitlist", user, book] => match parse_pair(user, book) {
                Some((user_id, book_id)) => {
                    match services.borrow.join_waitlist(Some(user_id), book_id).await {
                        Ok(entry) => println!("Joined the waitlist at position {}.", entry.position),
                        Err(e) => println!("Could not join the waitlist: {}", error_copy(&e)),
                    }
                }
                None => println!("Usage: waitlist <user-uuid> <book-id>"),
            },
            ["search", user, query @ ..] if !query.is_empty() => match user.parse::<Uuid>() {
                Ok(user_id) => {
                    let query = query.join(" ");
                    if let Err(e) = services.search_history.record(Some(user_id), &query).await {
                        println!("Could not record search: {}", error_copy(&e));
                    }
                }
                Err(_) => println!("Usage: search <user-uuid> <query>"),
            },
            ["history", user] => match user.parse::<Uuid>() {
                Ok(user_id) => match services.search_history.list(Some(user_id)).await {
                    Ok(entries) if entries.is_empty() => println!("No searches yet."),
                    Ok(entries) => {
                        for entry in entries {
                            println!("  {} {}", entry.created_at.format("%Y-%m-%d %H:%M"), entry.query);
                        }
                    }
                    Err(e) => println!("Could not load search history: {}", error_copy(&e)),
                },
                Err(_) => println!("Usage: history <user-uuid>"),
            },
            [name] => match name.parse::<AdminAction>() {
                Ok(action) => match monitor.execute_action(action, &confirm).await {
                    Ok(ActionOutcome::Declined) => println!("Cancelled."),
                    Ok(ActionOutcome::Executed { follow_up_error: Some(e), .. }) => println!(
                        "{} done, but the dashboard could not be updated: {}",
                        action.label(),
                        error_copy(&e)
                    ),
                    Ok(ActionOutcome::Executed { .. }) => {}
                    Err(e) => println!("{} failed: {}", action.label(), error_copy(&e)),
                },
                Err(e) => println!("{}", e),
            },
            _ => println!("Unknown command, type `help`"),
        }
    }

    monitor.teardown();
    auto_refresh.stop();
    renderer.abort();
    services.borrow.teardown();
    tracing::info!("Elidune Portal stopped");

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("elidune_portal={}", logging.level).into());

    // stdout belongs to the dashboard
    let (writer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "elidune-portal.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init();
    }

    guard
}

fn parse_pair(user: &str, book: &str) -> Option<(Uuid, BookId)> {
    Some((user.parse().ok()?, book.parse().ok()?))
}

fn print_help() {
    println!("Commands:");
    println!("  refresh | r                    re-fetch the health snapshot");
    for action in AdminAction::ALL {
        let marker = if action.is_destructive() { " (disruptive)" } else { "" };
        println!("  {:<30} {}{}", action.name(), action.label(), marker);
    }
    println!("  pending <user> <book>          check for a pending borrow request");
    println!("  borrow <user> <book>           request to borrow a book");
    println!("  waitlist <user> <book>         join a book's waitlist");
    println!("  search <user> <query>          record a catalog search");
    println!("  history <user>                 list recent searches");
    println!("  logout                         forget the admin token");
    println!("  quit | q");
}

/// User-facing copy per error kind
fn error_copy(e: &AppError) -> String {
    match e.kind() {
        ErrorKind::NotAuthenticated => "you need to sign in first".to_string(),
        ErrorKind::AlreadyInProgress => "already in progress, please wait".to_string(),
        ErrorKind::Network => "could not reach the library server, try again".to_string(),
        ErrorKind::Auth => "your admin token was rejected; you will be asked for a new one".to_string(),
        ErrorKind::Validation => e.to_string(),
        ErrorKind::Server => "the library server had a problem, try again later".to_string(),
        ErrorKind::Config | ErrorKind::Storage => e.to_string(),
    }
}

fn render(view: &HealthView) {
    println!();
    match view.phase {
        MonitorPhase::Idle => return,
        MonitorPhase::Loading => {
            println!("Loading system health...");
            return;
        }
        MonitorPhase::Error => {
            if let Some(e) = &view.error {
                println!("Could not load system health: {}", error_copy(e));
            }
            return;
        }
        MonitorPhase::Ready | MonitorPhase::Refreshing => {}
    }

    let Some(snapshot) = &view.snapshot else {
        return;
    };

    let status = &snapshot.system_status;
    let refreshed = view
        .last_refreshed
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "== System health ({}) last refreshed {}{}",
        view.phase,
        refreshed,
        snapshot
            .response_time_ms
            .map(|ms| format!(", {} ms", ms))
            .unwrap_or_default()
    );
    println!(
        "API: {}  Database: {}  Ingestion: {}  Storage: {}",
        status.api, status.database, status.ingestion, status.storage
    );

    let metrics = &snapshot.daily_metrics;
    println!(
        "Today: {} books added, {} searches, {} borrow requests, {} active users",
        metrics.books_added, metrics.searches, metrics.borrow_requests, metrics.active_users
    );

    let progress = &snapshot.ingestion_progress;
    println!(
        "Ingestion: {}/{} ({}%){}",
        progress.processed,
        progress.total,
        progress.percent(),
        progress
            .current_source
            .as_deref()
            .map(|s| format!(" from {}", s))
            .unwrap_or_default()
    );

    let storage = &snapshot.storage_health;
    println!(
        "Storage: {} used of {} ({}%), {} free",
        format_storage_size(storage.used_mb),
        format_storage_size(storage.total_mb),
        storage.usage_percent(),
        format_storage_size(storage.free())
    );

    let errors = &snapshot.error_summary;
    println!("Errors: {} in the last 24h, {} critical", errors.last24h, errors.critical);
    for entry in errors.recent.iter().take(3) {
        println!("  {} {}", entry.occurred_at.format("%H:%M"), entry.message);
    }

    if let Some(action) = view.action_in_progress {
        println!("Running: {}...", action.label());
    }
    if let Some(message) = &view.last_action_message {
        println!("{}", message);
    }
    if let Some(e) = &view.transient_error {
        println!("Last refresh failed: {}", error_copy(e));
    }
}
