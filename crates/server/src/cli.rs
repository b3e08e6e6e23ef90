//! CLI subcommand handlers.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surveyor_core::skills::{OpenAiClient, StructuredExtractor};
use surveyor_core::state::io::{ensure_runtime_dir, read_text, write_export};
use surveyor_core::state::{
    count_questions, render_markdown, write_codebook_csv, Snapshot, SnapshotStore, SurveyDb,
    WorkflowState,
};
use surveyor_core::workflow::{
    Coordinator, CoordinatorConfig, WorkflowEvent, WorkflowEventKind, WorkflowRun,
};
use tokio::sync::mpsc;

use crate::input::{require_notes, RunRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

pub async fn open_db() -> Result<SurveyDb> {
    ensure_runtime_dir().await?;
    SurveyDb::open().context("Failed to open the survey history database")
}

pub fn extractor() -> Result<Arc<dyn StructuredExtractor>> {
    let client = OpenAiClient::from_env().context("Failed to configure the LLM client")?;
    tracing::debug!(model = client.model(), "LLM client ready");
    Ok(Arc::new(client))
}

/// Brief text, or the contents of a file when given as `@path`
pub async fn resolve_brief(brief: &str) -> Result<String> {
    match brief.strip_prefix('@') {
        Some(path) => read_text(path).await,
        None => Ok(brief.to_string()),
    }
}

fn print_event(event: &WorkflowEvent) {
    let stage = event.stage.map(|s| s.to_string()).unwrap_or_default();
    match event.kind {
        WorkflowEventKind::StageStarted => println!("▶ {stage}"),
        WorkflowEventKind::StageCompleted => println!("✅ {stage}"),
        WorkflowEventKind::StageFailed => println!("❌ {stage}"),
        WorkflowEventKind::LoopDecision => {
            if let Some(data) = &event.data {
                println!(
                    "↻ QA passed: {}, revisions {}/{} -> {}",
                    data["passed"],
                    data["iter_count"],
                    data["max_iters"],
                    data["decision"].as_str().unwrap_or("?")
                );
            }
        }
        _ => {}
    }
}

/// Drive the coordinator while printing its progress events
async fn with_progress<F, Fut>(work: F) -> Result<WorkflowRun>
where
    F: FnOnce(Coordinator) -> Fut,
    Fut: std::future::Future<Output = surveyor_core::WorkflowResult<WorkflowRun>>,
{
    let (tx, mut rx) = mpsc::channel::<WorkflowEvent>(32);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    });

    let coordinator =
        Coordinator::new(CoordinatorConfig::default(), extractor()?).with_event_channel(tx);
    let result = work(coordinator).await;
    let _ = printer.await;

    Ok(result?)
}

fn print_summary(snapshot: &Snapshot) {
    let state = &snapshot.state;
    let input = state.input();
    println!();
    println!("📋 Snapshot {}", snapshot.id);
    println!("   Phase:      {}", state.phase());
    if let Some(qa) = state.qa() {
        println!("   QA passed:  {}", qa.passed);
        for issue in &qa.issues {
            println!("     - {issue}");
        }
    }
    if let Some(survey) = state.survey() {
        println!(
            "   Questions:  {} (target {}-{})",
            count_questions(survey),
            input.min_questions,
            input.max_questions
        );
    }
    println!("   Revisions:  {} auto, {} human", input.iter_count, input.human_revision_count);
}

async fn write_state(path: &Path, state: &WorkflowState) -> Result<()> {
    let json = serde_json::to_vec_pretty(state)?;
    write_export(path, &json).await?;
    println!("💾 Wrote {}", path.display());
    Ok(())
}

pub async fn run(
    request: RunRequest,
    out: Option<PathBuf>,
    default_max_questions: u32,
) -> Result<()> {
    let brief = resolve_brief(&request.brief).await?;
    let input = match (RunRequest { brief, ..request }).into_input(default_max_questions) {
        Ok(input) => input,
        Err(message) => bail!(message),
    };
    let db = open_db().await?;

    println!("🚀 Designing survey for: {}", input.audience);
    let run = with_progress(|mut c| async move { c.run_workflow(input).await }).await?;

    let snapshot = SnapshotStore::new(&db).save(&run.state, "run", None)?;
    print_summary(&snapshot);
    if let Some(path) = out {
        write_state(&path, &snapshot.state).await?;
    }
    Ok(())
}

pub async fn revise(snapshot_id: &str, notes: &str) -> Result<()> {
    let notes = match require_notes(notes) {
        Ok(notes) => notes.to_string(),
        Err(message) => bail!(message),
    };
    let db = open_db().await?;
    let store = SnapshotStore::new(&db);
    let parent = store.load(snapshot_id)?;

    println!("✏️  Revising {} from reviewer notes", parent.id);
    let state = parent.state.clone();
    let description = notes.clone();
    let run = with_progress(|mut c| async move {
        c.revise_with_notes(&state, &notes).await
    })
    .await?;

    let snapshot = store
        .snapshot("revise", run.state)
        .with_parent(Some(parent.id.as_str()))
        .with_description(&description);
    store.insert(&snapshot)?;
    print_summary(&snapshot);
    Ok(())
}

pub async fn approve(snapshot_id: &str, note: Option<&str>) -> Result<()> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    let db = open_db().await?;
    let snapshot = SnapshotStore::new(&db)
        .approve(snapshot_id, note)
        .with_context(|| format!("Failed to approve {snapshot_id}"))?;

    println!("🏁 Approved {} as {}", snapshot_id, snapshot.id);
    print_summary(&snapshot);
    Ok(())
}

async fn load_or_latest(snapshot_id: Option<&str>) -> Result<Snapshot> {
    let db = open_db().await?;
    let store = SnapshotStore::new(&db);
    match snapshot_id {
        Some(id) => Ok(store.load(id)?),
        None => store
            .latest()?
            .context("No saved surveys yet; start one with `surveyor run`"),
    }
}

pub async fn show(snapshot_id: Option<&str>) -> Result<()> {
    let snapshot = load_or_latest(snapshot_id).await?;
    print!("{}", render_markdown(&snapshot.state));
    Ok(())
}

pub async fn export(
    snapshot_id: Option<&str>,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let snapshot = load_or_latest(snapshot_id).await?;

    let content = match format {
        ExportFormat::Json => serde_json::to_vec_pretty(&snapshot.state)?,
        ExportFormat::Markdown => render_markdown(&snapshot.state).into_bytes(),
        ExportFormat::Csv => {
            let survey = snapshot
                .state
                .survey()
                .with_context(|| format!("Snapshot {} has no survey to export", snapshot.id))?;
            let mut buf = Vec::new();
            write_codebook_csv(survey, &mut buf).context("Failed to write codebook")?;
            buf
        }
    };

    match out {
        Some(path) => {
            write_export(&path, &content).await?;
            println!("💾 Wrote {}", path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&content)),
    }
    Ok(())
}

pub async fn history() -> Result<()> {
    let db = open_db().await?;
    let snapshots = SnapshotStore::new(&db).list()?;
    if snapshots.is_empty() {
        println!("No saved surveys yet.");
        return Ok(());
    }

    for snapshot in snapshots {
        let passed = match snapshot.state.qa() {
            Some(_) if snapshot.is_approved() => "approved",
            Some(qa) if qa.passed => "passed",
            Some(_) => "failed",
            None => "-",
        };
        let parent = snapshot
            .parent_id
            .as_deref()
            .map(|p| format!(" <- {p}"))
            .unwrap_or_default();
        println!(
            "{}  {}  {:<8} QA {:<8} {}{}",
            snapshot.id,
            snapshot.timestamp.format("%Y-%m-%d %H:%M"),
            snapshot.label,
            passed,
            snapshot.state.input().audience,
            parent
        );
    }
    Ok(())
}
