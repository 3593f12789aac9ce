//! CLI entry point for the rest-guard tool.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use reqwest::Method;
use rest_guard::{GuardDefinition, Node, RestGuard, Service, Ticket};
use tracing::{debug, info};

mod cli;

use cli::{Args, Command, TargetArgs};

const CLI_SERVICE: &str = "cli";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so stdout carries only response bodies and artifacts
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let definition = match &args.config {
        Some(path) => GuardDefinition::load(path)?,
        None => GuardDefinition::default(),
    };
    let guard = RestGuard::from_definition(&definition)?;

    match args.command {
        Command::Get(get) => {
            let mut ticket = prepare_ticket(&guard, &get.target)?;
            guard
                .execute_with_timeout(&mut ticket, get.target.timeout)
                .await?;
            info!(retries = ticket.retries(), "request succeeded");

            let response = ticket
                .take_response()
                .context("accepted response missing from ticket")?;
            let body = response.bytes().await.context("failed to read response body")?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&body)?;
            stdout.flush()?;
        }
        Command::Download(download) => {
            let mut ticket = prepare_ticket(&guard, &download.target)?;
            let artifact = guard
                .download_with_timeout(
                    &mut ticket,
                    &download.output,
                    download.digest,
                    download.target.timeout,
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&artifact)?);
        }
    }

    Ok(())
}

/// Resolves the target service and builds a GET request for the path.
fn prepare_ticket(guard: &RestGuard, target: &TargetArgs) -> Result<Ticket> {
    let service = match &target.service {
        Some(name) => guard.service(name)?,
        None => {
            if target.nodes.is_empty() {
                bail!("no nodes given; pass --node or --service with --config");
            }
            let service = Service::new(CLI_SERVICE)
                .with_retries(target.retries)
                .with_retry_interval_ms(target.retry_interval_ms)
                .with_nodes(
                    target
                        .nodes
                        .iter()
                        .enumerate()
                        .map(|(i, address)| Node::new(format!("node-{}", i + 1), address, target.tls)),
                );
            let service = Arc::new(service);
            guard.add_service(Arc::clone(&service));
            service
        }
    };

    let mut ticket = service.ticket();
    guard.create_request(&mut ticket, Method::GET, &target.path)?;
    Ok(ticket)
}
