use std::{process::ExitCode, str::FromStr};

use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod controller;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // Set up log file
    let log_directory = match cli.ensure_log_dir_path().await {
        Ok(path) => path,
        Err(err) => {
            eprintln!("{:#}", err);
            return ExitCode::FAILURE;
        }
    };
    let time = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_file_name = format!("odens-{time}.jsonl");
    let appender = tracing_appender::rolling::never(&log_directory, &log_file_name);
    let (non_blocking_appender, _guard) = tracing_appender::non_blocking(appender);

    // Set up tracing, `log` records from the library crates are forwarded to it
    let log_level = match tracing::Level::from_str(&cli.log_level) {
        Ok(level) => level,
        Err(_) => {
            eprintln!("Invalid log level: {}", cli.log_level);
            return ExitCode::FAILURE;
        }
    };
    let stdout_layer = fmt::Subscriber::builder()
        .with_max_level(log_level)
        .without_time()
        .finish();
    let logfile_layer = fmt::Layer::default()
        .json()
        .with_ansi(false)
        .with_writer(non_blocking_appender);
    if let Err(err) = stdout_layer.with(logfile_layer).try_init() {
        eprintln!("Unable to set global tracing subscriber: {}", err);
        return ExitCode::FAILURE;
    }

    tracing::info!(
        "Saving logs to {}",
        log_directory.join(&log_file_name).display()
    );

    cli.start().await
}
