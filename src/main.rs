use anyhow::{Context, Result};
use edaflow::cli::commands::{HistoryCommand, RunCommand, StepsCommand, ToolArg, ValidateCommand};
use edaflow::cli::output::*;
use edaflow::cli::{Cli, Command};
use edaflow::core::{CheckpointIo, FlowConfig, RunState, StartPoint, Step};
use edaflow::execution::{Finalize, PipelineError, PipelineEvent, StepPipeline, SubprocessRunner, ToolRunner};
use edaflow::persistence::{RunStore, RunSummary};
use edaflow::tools::{Genus, Innovus, Joules, ToolKind, Xcelium};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_flow(cmd, cli.verbose).await?,
        Command::Validate(cmd) => validate_flow(cmd)?,
        Command::Steps(cmd) => list_steps(cmd),
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

/// Result of driving one flow, kept separate from the error so a failed run
/// still lands in history.
struct FlowOutcome {
    run: RunState,
    result: Result<(), PipelineError>,
}

async fn run_flow(cmd: &RunCommand, verbose: bool) -> Result<()> {
    let config = FlowConfig::from_file(&cmd.file).context("Failed to load flow config")?;

    println!("{} Loaded flow: {}", INFO, style(&config.name).bold());

    let mut settings = config.settings();
    for (key, value) in &cmd.set {
        settings.overlay(key, value);
        println!(
            "{} Setting override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    if cmd.generate_only {
        settings.overlay("synthesis.genus.generate_only", "true");
    }

    let tool = resolve_tool(cmd.tool, &config)?;

    let missing = tool.missing_settings(&settings);
    if !missing.is_empty() {
        for key in &missing {
            println!("{} Missing required setting: {}", CROSS, style(key).red());
        }
        anyhow::bail!("{} required settings missing for tool `{}`", missing.len(), tool);
    }

    let run_dir = cmd
        .rundir
        .clone()
        .unwrap_or_else(|| config.run_dir_or(&format!("{}-rundir", tool)));
    let runner: Arc<dyn ToolRunner> = Arc::new(SubprocessRunner::new());
    let start = StartPoint::from_option(cmd.from_step.clone());

    println!();
    let outcome = match tool {
        ToolKind::Par => {
            let flow = Innovus::new(settings, run_dir.clone(), runner)?;
            drive(flow, Innovus::steps(), Innovus::checkpoints(), run_dir, start, verbose).await?
        }
        ToolKind::Synthesis => {
            let flow = Genus::new(settings, run_dir.clone(), runner)?;
            drive(flow, Genus::steps(), Genus::checkpoints(), run_dir, start, verbose).await?
        }
        ToolKind::Power => {
            let flow = Joules::new(settings, run_dir.clone(), runner)?;
            drive(flow, Joules::steps(), Joules::checkpoints(), run_dir, start, verbose).await?
        }
        ToolKind::Sim => {
            let flow = Xcelium::new(settings, run_dir.clone(), runner)?;
            drive(flow, Xcelium::steps(), Xcelium::checkpoints(), run_dir, start, verbose).await?
        }
    };

    // Save to history
    if !cmd.no_history {
        let store = open_store().await?;
        let summary = RunSummary::from_run_state(
            &outcome.run,
            &config.name,
            &tool.to_string(),
            cmd.from_step.as_deref(),
        );
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    match outcome.result {
        Ok(()) => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&config.name).bold(),
                style("successfully").green()
            );
            Ok(())
        }
        Err(e) => {
            println!("\n{} {} {}", CROSS, style(&config.name).bold(), style("failed").red());
            error!("{:#}", anyhow::Error::from(e));
            std::process::exit(1);
        }
    }
}

async fn drive<S>(
    mut flow: S,
    steps: Vec<Step<S>>,
    checkpoints: Box<dyn CheckpointIo<S>>,
    run_dir: PathBuf,
    start: StartPoint,
    verbose: bool,
) -> Result<FlowOutcome>
where
    S: Finalize + Send,
{
    let mut pipeline = StepPipeline::new(steps, checkpoints, run_dir)?;

    // Verbose runs print every event; otherwise a progress bar spans the steps.
    let progress = if verbose {
        pipeline.add_event_handler(|event| println!("{}", format_pipeline_event(event)));
        None
    } else {
        let progress = create_progress_bar(pipeline.step_names().len());
        let pb = progress.clone();
        pipeline.add_event_handler(move |event| match event {
            PipelineEvent::StepStarted { step, .. } => pb.set_message(step.clone()),
            PipelineEvent::StepCompleted { .. } => pb.inc(1),
            PipelineEvent::Finalizing => pb.set_message("running tool"),
            _ => {}
        });
        Some(progress)
    };

    let result = pipeline.run(&mut flow, start).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }

    Ok(FlowOutcome { run: pipeline.run_state().clone(), result })
}

/// The CLI flag wins; otherwise the config's `tool` field decides.
fn resolve_tool(arg: Option<ToolArg>, config: &FlowConfig) -> Result<ToolKind> {
    if let Some(arg) = arg {
        return Ok(arg.into());
    }
    match &config.tool {
        Some(name) => ToolKind::from_name(name)
            .ok_or_else(|| anyhow::anyhow!("unknown tool `{}` in flow config", name)),
        None => anyhow::bail!("no tool selected; pass --tool or set `tool` in the flow config"),
    }
}

#[cfg(feature = "sqlite")]
async fn open_store() -> Result<Arc<dyn RunStore>> {
    Ok(Arc::new(edaflow::persistence::SqliteRunStore::with_default_path().await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store() -> Result<Arc<dyn RunStore>> {
    Ok(Arc::new(edaflow::persistence::InMemoryRunStore::new()))
}

fn validate_flow(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating flow configuration...", INFO);

    match FlowConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Flow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            if let Some(version) = &config.version {
                println!("  Version: {}", style(version).cyan());
            }
            println!("  Run dir: {}", style(config.run_dir_or(".").display()).dim());

            // Check the per-tool required settings when a tool is named,
            // either on the command line or in the config itself.
            let tool = cmd
                .tool
                .map(ToolKind::from)
                .or_else(|| config.tool.as_deref().and_then(ToolKind::from_name));
            if let Some(tool) = tool {
                let missing = tool.missing_settings(&config.settings());
                if missing.is_empty() {
                    println!("  {} All required {} settings present", CHECK, style(tool).cyan());
                } else {
                    for key in &missing {
                        println!("  {} Missing required setting: {}", CROSS, style(key).red());
                    }
                    std::process::exit(1);
                }
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn list_steps(cmd: &StepsCommand) {
    let tool: ToolKind = cmd.tool.into();
    println!("{} Steps for {}:", INFO, style(&tool.to_string()).bold());
    for (i, name) in tool.step_names().iter().enumerate() {
        let marker = if i == 0 { style(" (default start)").dim().to_string() } else { String::new() };
        println!("  {}. {}{}", i + 1, style(name).cyan(), marker);
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store().await?;

    // Specific run requested by ID
    if let Some(run_id_str) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id_str).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.verbose)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = if let Some(flow_name) = &cmd.flow {
        store.list_runs(flow_name).await?
    } else {
        let flows = store.list_flows().await?;
        let mut all_runs = Vec::new();
        for flow in &flows {
            all_runs.extend(store.list_runs(flow).await?);
        }
        all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        all_runs.into_iter().take(cmd.limit).collect()
    };

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        for summary in &runs {
            println!("  {}", format_run_summary(summary));
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Flow: {}", style(&summary.flow_name).bold());
    println!("  Tool: {}", style(&summary.tool).cyan());
    println!("  Status: {}", format_status(summary.status));
    if let Some(start_step) = &summary.start_step {
        println!("  Resumed from: {}", style(start_step).cyan());
    }
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!("  Steps: {}/{}", summary.completed_steps, summary.total_steps);

    if verbose {
        println!("\n  {}", style("Full details:").bold());
        let json = serde_json::to_string_pretty(summary)?;
        for line in json.lines() {
            println!("    {}", line);
        }
    }

    Ok(())
}

fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
