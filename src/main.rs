#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::path;
use std::process;

use anyhow::Error;
use tokio::sync::mpsc;
use tokio::sync::watch;
use yansi::Paint;

use crate::application::cli;
use crate::application::ui;
use crate::domain::models::ClientError;
use crate::domain::models::Event;

/// Directory the debug log is written to when `RUST_LOG` mentions agentdesk.
pub fn log_dir() -> path::PathBuf {
    if let Ok(dir) = env::var("AGENTDESK_LOG_DIR") {
        return path::PathBuf::from(dir);
    }

    return dirs::cache_dir()
        .unwrap_or_else(|| return path::PathBuf::from("."))
        .join("agentdesk");
}

fn handle_error(err: Error) {
    // Request failures were already printed as a notice.
    if let Some(client_err) = err.downcast_ref::<ClientError>() {
        if matches!(client_err, ClientError::UnknownProvider(_)) {
            eprintln!("{}", Paint::red(client_err));
        }
        process::exit(1);
    }

    eprintln!(
            "{}",
            Paint::red(format!(
                "Oh no! Agentdesk has failed with the following app version and error.\n\nVersion: {}\nCommit: {}\nError: {}",
                env!("CARGO_PKG_VERSION"),
                env!("VERGEN_GIT_DESCRIBE"),
                err
            ))
        );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 RUST_LOG=agentdesk {args}");
        eprintln!("\nThe debug log is written to {}", log_dir().join("debug.log").display());
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let file_appender = tracing_appender::rolling::never(log_dir(), "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("agentdesk")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();
    let (printed_tx, printed_rx) = watch::channel(0u64);
    let printer = tokio::spawn(ui::render_events(event_rx, printed_tx));

    let res = cli::parse(event_tx, printed_rx).await;

    // Every sender is gone once parse returns, so the printer drains and exits.
    match printer.await {
        Ok(Err(printer_err)) => {
            tracing::warn!(error = ?printer_err, "Event printer failed");
        }
        Err(join_err) => {
            tracing::warn!(error = ?join_err, "Event printer task failed");
        }
        Ok(Ok(())) => {}
    }

    if let Err(err) = res {
        handle_error(err);
    }

    process::exit(0);
}
