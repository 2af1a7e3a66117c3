mod commands;
mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use console_core::{ConsoleHandle, ConsoleSession, HttpBackend, Notification, SessionOptions};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::commands::{parse_command, ConsoleCommand, HELP};

#[derive(Parser, Debug)]
struct Args {
    /// Elevator backend base URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file; defaults to `console.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(log_filter) = args.log_filter {
        settings.log_filter = log_filter;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let backend = HttpBackend::new(&settings.server_url)?;
    info!(server_url = %backend.base_url(), "starting elevator console");
    let (handle, session) = ConsoleSession::start(
        Arc::new(backend),
        SessionOptions {
            notification_capacity: settings.notification_capacity,
        },
    );
    tokio::spawn(print_notifications(handle.subscribe_notifications()));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        if matches!(command, ConsoleCommand::Quit) {
            break;
        }
        run_command(&handle, command).await;
    }

    handle.shutdown();
    if let Err(err) = session.await {
        warn!(error = %err, "console session ended abnormally");
    }
    Ok(())
}

async fn run_command(handle: &ConsoleHandle, command: ConsoleCommand) {
    let name = command.name();
    let result = match command {
        ConsoleCommand::Call { floor, direction } => handle
            .press_call(floor, direction)
            .await
            .map(|index| format!("call for floor {floor} going {direction} queued (#{index})")),
        ConsoleCommand::Go {
            floor,
            requested_floors,
            car,
        } => handle
            .submit_floors(floor, car.clone(), requested_floors)
            .await
            .map(|index| format!("destinations for {car} at floor {floor} queued (#{index})")),
        ConsoleCommand::Show => Ok(render::render_snapshot(&handle.snapshot())),
        ConsoleCommand::Help => Ok(HELP.to_string()),
        ConsoleCommand::Quit => return,
    };

    match result {
        Ok(text) => println!("{}", text.trim_end()),
        Err(err) => println!("{name} rejected: {err}"),
    }
}

async fn print_notifications(mut notifications: broadcast::Receiver<Notification>) {
    loop {
        match notifications.recv().await {
            Ok(notification) => println!("{}", render::render_notification(&notification)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "notification printer fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
