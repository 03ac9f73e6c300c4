//! CLI entrypoint for agent-conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use conductor_application::{
    AdaptivePlanner, AgentResolver, CompositeProgress, CoordinationConfig, FinalResponse,
    MessageJournal, Orchestrator, OrchestratorInput, Planner, ProgressListener, RequestPlanner,
};
use conductor_domain::{ComplexitySignal, OutputFormat, PlanningContext};
use conductor_infrastructure::{
    ConfigLoader, EchoToolAgent, JsonlMessageJournal, MessageBus, StepEventPublisher,
    ToolAgentRegistry,
};
use conductor_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormatter, ProgressReporter, RequestArgs,
    SimpleProgress,
};
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref())?;

    info!("Starting agent-conductor");

    // === Configuration ===
    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        println!("{}", ConfigLoader::render(&file_config)?);
        return Ok(ExitCode::SUCCESS);
    }

    for issue in ConfigLoader::check(&file_config)? {
        warn!(code = ?issue.code, "{}", issue.message);
        if !cli.quiet {
            eprintln!("{issue}");
        }
    }

    if !file_config.output.use_color(std::io::stdout().is_terminal()) {
        colored::control::set_override(false);
    }

    let format = file_config
        .output
        .resolve_format(cli.output.map(OutputFormat::from));

    let Some(command) = cli.command else {
        bail!("No command given. Try `conductor --help`.");
    };

    let config = file_config.to_coordination_config();

    // === Dependency Injection ===
    let journal = match &cli.journal {
        Some(path) => {
            let journal = JsonlMessageJournal::create(path)
                .with_context(|| format!("Cannot open journal {}", path.display()))?;
            info!(path = %journal.path().display(), "Journaling bus traffic");
            Some(Arc::new(journal))
        }
        None => None,
    };
    let bus = match &journal {
        Some(journal) => {
            let sink: Arc<dyn MessageJournal> = journal.clone();
            MessageBus::with_journal(config.bus.clone(), sink)
        }
        None => MessageBus::new(config.bus.clone()),
    };

    let registry = ToolAgentRegistry::new(bus.clone(), config.registry.clone());
    for agent in EchoToolAgent::fleet() {
        registry.register(Arc::new(agent)).await?;
    }
    registry.start_monitoring();

    let outcome = match command {
        Command::Agents => {
            println!(
                "{}",
                ConsoleFormatter::format_agents(&registry.registrations(), format)
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Plan(args) => plan(&args, &config, registry.as_ref(), format).await,
        Command::Run(args) => {
            run(&args, &config, registry.clone(), bus.clone(), format, cli.quiet).await
        }
    };

    registry.shutdown().await;
    let metrics = bus.metrics();
    info!(
        messages = metrics.total_messages,
        errors = metrics.total_errors,
        "Bus closed"
    );
    bus.close();
    if let Some(journal) = &journal {
        info!(
            path = %journal.path().display(),
            lines = journal.lines_written(),
            "Journal written"
        );
    }

    outcome
}

/// Install the stderr subscriber and, with `--log-dir`, a daily file.
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, "conductor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn select_planner(args: &RequestArgs, config: &CoordinationConfig) -> Arc<dyn Planner> {
    if config.orchestrator.adaptive && !args.static_plan {
        Arc::new(AdaptivePlanner::new(config.planner.clone()))
    } else {
        Arc::new(RequestPlanner::new())
    }
}

fn orchestrator_input(args: &RequestArgs, resolver: &dyn AgentResolver) -> OrchestratorInput {
    let mut complexity = ComplexitySignal::new(args.complexity);
    if let Some(task_type) = args.task_type {
        complexity = complexity.with_task_hint(task_type);
    }

    let mut context =
        PlanningContext::new().with_available_agent_types(resolver.available_agent_types());
    if let Some(root) = &args.project_root {
        context = context.with_project_root(root.display().to_string());
    }

    OrchestratorInput::new(args.request.clone())
        .with_complexity(complexity)
        .with_context(context)
}

async fn plan(
    args: &RequestArgs,
    config: &CoordinationConfig,
    resolver: &dyn AgentResolver,
    format: OutputFormat,
) -> Result<ExitCode> {
    let input = orchestrator_input(args, resolver);
    let plan = select_planner(args, config)
        .create_plan(&input.request, &input.complexity, &input.context)
        .await?;

    println!("{}", ConsoleFormatter.render_plan(&plan, format));
    Ok(ExitCode::SUCCESS)
}

async fn run(
    args: &RequestArgs,
    config: &CoordinationConfig,
    registry: Arc<ToolAgentRegistry>,
    bus: Arc<MessageBus>,
    format: OutputFormat,
    quiet: bool,
) -> Result<ExitCode> {
    let input = orchestrator_input(args, registry.as_ref());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the running step");
            interrupt.cancel();
        }
    });

    let resolver: Arc<dyn AgentResolver> = registry;
    let orchestrator = Orchestrator::new(
        select_planner(args, config),
        resolver,
        config.orchestrator.clone(),
    )
    .with_cancellation(cancel);

    // Step lifecycle always goes to the bus; console progress only when wanted
    let step_events = StepEventPublisher::new(bus);
    let progress = CompositeProgress::new(Vec::new()).with(&step_events);
    let response = if quiet || format.is_machine_readable() {
        orchestrator.process(input, &progress).await
    } else if !std::io::stderr().is_terminal() {
        let simple: &dyn ProgressListener = &SimpleProgress;
        orchestrator.process(input, &progress.with(simple)).await
    } else {
        let reporter = ProgressReporter::new();
        orchestrator.process(input, &progress.with(&reporter)).await
    };

    print_response(&response, format);

    Ok(if response.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_response(response: &FinalResponse, format: OutputFormat) {
    println!("{}", ConsoleFormatter.render_response(response, format));
}
