//! CLI entrypoint for concord
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser};
use concord_application::{
    AuditLogger, CouncilState, GovernancePipeline, InMemoryStateStore, NoAuditLogger, NoProgress,
    StateStore, SubmitTaskInput, SubmitTaskUseCase, ThrottleEvaluator,
};
use concord_domain::util::current_timestamp;
use concord_domain::{ConsensusEngine, Task, TaskHints, TaskId, TaskPriority, ThrottleMode};
use concord_infrastructure::{
    ConfigLoader, FileConfig, JsonFileStateStore, JsonlAuditLogger, build_backend,
};
use concord_infrastructure::config::FileLoggingConfig;
use concord_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, OutputFormatter, ProgressReporter, SubmitArgs,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // === Configuration ===
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let _log_guard = init_tracing(&cli, &file_config.logging)?;
    info!("Starting concord");

    for issue in file_config.ensure_valid()? {
        warn!("{}", issue);
    }
    if !file_config.output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let governor = file_config.to_governor_config();

    let audit: Arc<dyn AuditLogger> = match file_config
        .logging
        .audit_log
        .as_deref()
        .and_then(JsonlAuditLogger::new)
    {
        Some(logger) => Arc::new(logger),
        None => Arc::new(NoAuditLogger),
    };

    let state = Arc::new(CouncilState::new(&governor).with_audit_logger(audit.clone()));
    let now = current_timestamp();
    for participant in &file_config.participants {
        state
            .register_participant(participant.to_participant(now))
            .await
            .with_context(|| format!("Failed to register participant '{}'", participant.id))?;
    }

    let store: Arc<dyn StateStore> = match &file_config.persistence.state_file {
        Some(path) => Arc::new(JsonFileStateStore::new(path)),
        None => Arc::new(InMemoryStateStore::new()),
    };
    match store.load().await {
        Ok(Some(saved)) => state.restore(saved).await,
        Ok(None) => {}
        Err(e) => warn!("Ignoring unreadable state file: {}", e),
    }

    // Periodic trend evaluation runs for the lifetime of the process
    let cancel = CancellationToken::new();
    let evaluator =
        ThrottleEvaluator::new(state.clone(), governor.evaluation_interval).spawn(cancel.clone());

    let result = match command {
        Command::Submit(args) => {
            let engine = ConsensusEngine::new(governor.consensus.clone());
            let pipeline =
                GovernancePipeline::new(file_config.governance.build_stages(), governor.pipeline.clone())
                    .with_audit_logger(audit.clone());
            let backend = Arc::new(build_backend(&file_config.participants));
            let use_case = SubmitTaskUseCase::new(state.clone(), backend, engine, pipeline)
                .with_state_store(store.clone())
                .with_debate(governor.debate && !args.no_debate);

            run_submit(&cli, &file_config, &use_case, args).await
        }
        Command::Metrics => {
            println!("{}", ConsoleFormatter::format_metrics(&state.load_metrics().await));
            Ok(())
        }
        Command::Participants => {
            println!(
                "{}",
                ConsoleFormatter::format_participants(&state.participant_stats().await)
            );
            Ok(())
        }
    };

    cancel.cancel();
    if let Err(e) = evaluator.await {
        warn!("Throttle evaluator ended abnormally: {}", e);
    }
    if let Err(e) = store.save(&state.snapshot().await).await {
        warn!("Failed to save council state: {}", e);
    }

    result
}

async fn run_submit(
    cli: &Cli,
    file_config: &FileConfig,
    use_case: &SubmitTaskUseCase,
    args: &SubmitArgs,
) -> Result<()> {
    let task = build_task(args, current_timestamp())?;
    let mut input = SubmitTaskInput::new(task);
    if let Some(mode) = &args.mode {
        let mode: ThrottleMode = mode.parse().map_err(|e: String| anyhow!(e))?;
        input = input.with_mode(mode);
    }

    let report = if cli.quiet || !file_config.output.show_progress {
        use_case.execute_with_progress(input, &NoProgress).await?
    } else {
        let progress = ProgressReporter::new();
        use_case.execute_with_progress(input, &progress).await?
    };

    let format = args
        .output
        .or_else(|| file_config.output.format.map(OutputFormat::from))
        .unwrap_or(OutputFormat::Summary);
    let formatter = ConsoleFormatter;
    let output = match format {
        OutputFormat::Full => formatter.format(&report),
        OutputFormat::Summary => formatter.format_summary(&report),
        OutputFormat::Json => formatter.format_json(&report),
    };
    println!("{}", output);

    Ok(())
}

fn build_task(args: &SubmitArgs, now_ms: u64) -> Result<Task> {
    let id = args.id.clone().map(TaskId::new).unwrap_or_else(TaskId::generate);
    let priority: TaskPriority = args.priority.parse().map_err(|e: String| anyhow!(e))?;

    let defaults = TaskHints::default();
    let hints = TaskHints {
        confidence: args.confidence.unwrap_or(defaults.confidence),
        safety_level: args.safety.unwrap_or(defaults.safety_level),
        complexity: args.complexity.unwrap_or(defaults.complexity),
    };

    let mut task = Task::new(id, args.payload.clone())
        .with_priority(priority)
        .with_hints(hints);
    for capability in &args.capabilities {
        task = task.with_capability(capability.clone());
    }
    if let Some(deadline) = args.deadline_ms {
        task = task.with_deadline(now_ms.saturating_add(deadline));
    }
    Ok(task)
}

/// Stderr logging filtered by `-v`, `RUST_LOG` or `logging.level`, plus an
/// optional plain-text log file.
fn init_tracing(cli: &Cli, logging: &FileLoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = logging.level.as_deref().unwrap_or("warn");
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
        }),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let log_file = cli
        .log_file
        .clone()
        .or_else(|| logging.file.as_ref().map(PathBuf::from));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Invalid log file path: {}", path.display()))?
                .to_owned();
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit_args(argv: &[&str]) -> SubmitArgs {
        let mut full = vec!["concord", "submit"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Some(Command::Submit(args)) => args,
            other => panic!("expected submit, got {:?}", other),
        }
    }

    #[test]
    fn test_build_task_from_flags() {
        let args = submit_args(&[
            "rotate keys",
            "--id",
            "t-9",
            "-c",
            "ops",
            "--priority",
            "critical",
            "--deadline-ms",
            "500",
            "--safety",
            "0.9",
        ]);
        let task = build_task(&args, 1_000).unwrap();
        assert_eq!(task.id.as_str(), "t-9");
        assert_eq!(task.priority, TaskPriority::Critical);
        assert_eq!(task.required_capabilities, vec!["ops"]);
        assert_eq!(task.deadline, Some(1_500));
        assert_eq!(task.hints.safety_level, 0.9);
        assert_eq!(task.hints.confidence, 1.0);
    }

    #[test]
    fn test_build_task_generates_id() {
        let task = build_task(&submit_args(&["hello"]), 42).unwrap();
        assert!(task.id.as_str().starts_with("task-"));
        assert_eq!(task.priority, TaskPriority::Normal);
    }

    #[test]
    fn test_build_task_rejects_unknown_priority() {
        assert!(build_task(&submit_args(&["hello", "-p", "urgent"]), 0).is_err());
    }
}
