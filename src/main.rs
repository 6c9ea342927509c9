//! onionscope - Today's horoscope from The Onion
//!
//! Answers `.scope <sign>` queries from a disk cache that is refetched once a
//! day. Give a sign on the command line for a single answer, or pipe chat
//! commands through stdin to answer them as they arrive.

use std::io;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tracing::error;
use tracing_subscriber::EnvFilter;

use onionscope::cache::CachedStore;
use onionscope::cli::{Cli, StartupConfig};
use onionscope::command::{parse_command, ScopeCommand};
use onionscope::scrape::{BlockingOnion, OnionClient};

type Command = ScopeCommand<BlockingOnion>;

/// Runs one query on a blocking thread
///
/// The store lock and the scrape are both blocking, so they stay off the
/// async workers.
async fn answer(command: Arc<Command>, sign: Option<String>) -> Result<String, JoinError> {
    tokio::task::spawn_blocking(move || command.reply(sign.as_deref())).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "onionscope=warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let store = Arc::new(CachedStore::open(config.db_path(), config.stale_after)?);
    if config.force_refresh {
        store.invalidate()?;
    }

    let client = OnionClient::new(config.base_url.clone(), config.timeout)?;
    let provider = BlockingOnion::new(client, Handle::current());
    let command = Arc::new(ScopeCommand::new(store, provider));

    if let Some(sign) = config.query {
        println!("{}", answer(command, Some(sign)).await?);
        return Ok(());
    }

    // Each line is answered concurrently, like simultaneous chat commands.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = Arc::clone(&command);
        pending.push(tokio::spawn(async move {
            let sign = parse_command(&line).map(str::to_string);
            match answer(command, sign).await {
                Ok(reply) => println!("{}", reply),
                Err(e) => error!(error = %e, line = %line, "query task failed"),
            }
        }));
    }

    for result in futures::future::join_all(pending).await {
        if let Err(e) = result {
            error!(error = %e, "query task panicked");
        }
    }

    Ok(())
}
