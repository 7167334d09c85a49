//! InnoMed command-line client.
//!
//! Streams a molecule analysis from the backend and renders status updates,
//! agent arrivals and report tokens as they come in.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (validation, connection, backend error)

mod cli;

use std::collections::BTreeSet;
use std::io::Write as _;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Command, QueryArgs};
use innomed_stream::observability::init_observability;
use innomed_stream::prelude::*;
use tracing::debug;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    init_observability(if args.verbose { "debug" } else { "warn" });
    debug!("arguments: {args:?}");

    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let backend = HttpBackend::new(args.client_config())?;
    match args.command {
        Command::Stream { query, json } => stream(backend, &query, json).await,
        Command::Query { query } => {
            let request = SessionRequest::new(&query.molecule, &query.prompt)?;
            let model = backend.query(&request).await?;
            println!("{:#}", model.to_json());
            Ok(())
        }
        Command::Report { molecule, out } => {
            std::fs::create_dir_all(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            let path = backend.download_artifact(&molecule, &out).await?;
            println!("report saved to {}", path.display());
            Ok(())
        }
        Command::Mit { molecule } => {
            let mit = backend.fetch_mit(&molecule).await?;
            println!("{mit:#}");
            Ok(())
        }
    }
}

async fn stream(backend: HttpBackend, query: &QueryArgs, json: bool) -> Result<()> {
    let request = SessionRequest::new(&query.molecule, &query.prompt)?;
    let (controller, mut observer) = backend.into_controller()?;
    controller.start(request);

    let mut progress = Progress::default();
    while let Some(update) = observer.next_update().await {
        match update {
            SessionUpdate::Started { session_id, .. } => {
                debug!(%session_id, "session started");
                if !json {
                    eprintln!("analyzing {} ...", query.molecule);
                }
            }
            SessionUpdate::ModelChanged { model, .. } => {
                if !json {
                    progress.render(&model)?;
                }
            }
            SessionUpdate::Completed { model, .. } => {
                if !json && progress.printed_tokens > 0 {
                    println!();
                }
                println!("{:#}", model.to_json());
                return Ok(());
            }
            SessionUpdate::Failed { failure, .. } => {
                if progress.printed_tokens > 0 {
                    println!();
                }
                return Err(ClientError::from(failure).into());
            }
        }
    }
    anyhow::bail!("stream ended without a result")
}

/// Tracks what has already been printed so each update only prints the
/// delta.
#[derive(Default)]
struct Progress {
    status: Option<serde_json::Value>,
    agents: BTreeSet<String>,
    printed_tokens: usize,
}

impl Progress {
    fn render(&mut self, model: &ResultModel) -> Result<()> {
        if let Some(status) = model.section("status")
            && self.status.as_ref() != Some(status)
        {
            self.status = Some(status.clone());
            match status.as_str() {
                Some(text) => eprintln!("status: {text}"),
                None => eprintln!("status: {status}"),
            }
        }
        for name in model.agents().keys() {
            if self.agents.insert(name.clone()) {
                eprintln!("agent finished: {name}");
            }
        }
        let tokens = model.token_buffer();
        if tokens.len() > self.printed_tokens {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(tokens[self.printed_tokens..].as_bytes())?;
            stdout.flush()?;
            self.printed_tokens = tokens.len();
        }
        Ok(())
    }
}
