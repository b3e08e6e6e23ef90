//! Surveyor
//!
//! CLI and HTTP server for the survey design workflow. Every run and revision
//! is saved to the snapshot history under `.surveyor/`.

mod api;
mod cli;
mod input;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use surveyor_core::workflow::CoordinatorConfig;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::api::AppState;
use crate::cli::ExportFormat;
use crate::input::{default_max_questions, RunRequest};

#[derive(Parser, Clone)]
#[command(author, version, about = "Surveyor - LLM-assisted survey design")]
struct Args {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand, Clone)]
enum CliCommand {
    /// Plan, draft and review a survey from a brief
    Run {
        /// Project brief, or `@path` to read it from a file
        #[arg(long)]
        brief: String,
        /// Who will answer the survey
        #[arg(long)]
        audience: String,
        /// Question target (defaults to DEFAULT_MAX_QUESTIONS or 20)
        #[arg(long)]
        max_questions: Option<u32>,
        #[arg(long)]
        min_questions: Option<u32>,
        /// Auto-revision budget after a failed QA
        #[arg(long)]
        max_iters: Option<u32>,
        /// Also write the final state as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Revise a saved survey from reviewer notes
    Revise {
        #[arg(long)]
        snapshot: String,
        #[arg(long)]
        notes: String,
    },
    /// Sign off on a saved survey
    Approve {
        #[arg(long)]
        snapshot: String,
        /// Optional sign-off note
        #[arg(long)]
        note: Option<String>,
    },
    /// Print a saved survey as Markdown (latest if no id)
    Show {
        #[arg(long)]
        snapshot: Option<String>,
    },
    /// Export a saved survey
    Export {
        #[arg(long)]
        snapshot: Option<String>,
        #[arg(long, value_enum, default_value = "json")]
        format: ExportFormat,
        /// Output file (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List saved snapshots, newest first
    History,
    /// Start the HTTP API (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

// === Server Entry ===

pub async fn run_server(port: u16) -> anyhow::Result<()> {
    let db = Arc::new(cli::open_db().await?);
    let state = AppState {
        db,
        extractor: cli::extractor()?,
        config: CoordinatorConfig::default(),
        default_max_questions: default_max_questions(),
    };

    let app = api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("🚀 Surveyor Server running at http://{}", addr);
    println!("   Surveys:  /api/v1/surveys (GET, POST)");
    println!("   Survey:   /api/v1/surveys/:id, /revise, /approve, /codebook.csv");
    println!("   OpenAPI:  /api/v1/openapi.json");

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    match args.command {
        Some(CliCommand::Run {
            brief,
            audience,
            max_questions,
            min_questions,
            max_iters,
            out,
        }) => {
            let request = RunRequest {
                brief,
                audience,
                max_questions,
                min_questions,
                max_iters,
            };
            cli::run(request, out, default_max_questions()).await
        }
        Some(CliCommand::Revise { snapshot, notes }) => cli::revise(&snapshot, &notes).await,
        Some(CliCommand::Approve { snapshot, note }) => {
            cli::approve(&snapshot, note.as_deref()).await
        }
        Some(CliCommand::Show { snapshot }) => cli::show(snapshot.as_deref()).await,
        Some(CliCommand::Export {
            snapshot,
            format,
            out,
        }) => cli::export(snapshot.as_deref(), format, out).await,
        Some(CliCommand::History) => cli::history().await,
        Some(CliCommand::Serve { port }) => run_server(port).await,
        None => run_server(8080).await,
    }
}
