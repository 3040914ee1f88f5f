use anyhow::{Context, Result};
use stageline::cli::commands::{RunCommand, StagesCommand, ValidateCommand};
use stageline::cli::output::*;
use stageline::cli::{Cli, Command};
use stageline::core::config::PipelineConfig;
use stageline::core::settings::RunnerConfig;
use stageline::secrets::{FileSecretStore, InMemorySecretStore, SecretStore};
use stageline::tool::CommandTool;
use stageline::{PipelineEngine, RunContext, StageSelection, Workspace};
use std::sync::Arc;
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    let success = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, &cli).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::Stages(cmd) => list_stages(cmd)?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, cli: &Cli) -> Result<bool> {
    let settings = RunnerConfig::load(cli.config.as_deref())?;

    let config = PipelineConfig::from_file(&cmd.file)
        .with_context(|| format!("Failed to load pipeline config: {}", cmd.file.display()))?;
    let pipeline = config.to_pipeline();

    println!("{} Loaded pipeline: {}", INFO, style(&pipeline.name).bold());

    let root = match &cmd.workspace {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("Workspace does not exist: {}", root.display()))?;
    let workspace = Workspace::new(root);

    // Explicit --stages, else run.stages from the run properties, else all
    let selection = match &cmd.stages {
        Some(list) => StageSelection::parse(list),
        None => {
            let props = workspace
                .load_run_properties()
                .await
                .context("Failed to read run properties")?;
            StageSelection::from_run_properties(&props)
        }
    };

    let mut tool_config = settings.tool.clone();
    if let Some(program) = &cmd.tool {
        tool_config.program = program.clone();
    }
    if let Some(home) = &cmd.tool_home {
        tool_config.home = Some(home.clone());
    }

    let store: Arc<dyn SecretStore> = match cmd.secrets.as_ref().or(settings.secrets_file.as_ref()) {
        Some(path) => {
            println!("{} Secret store: {}", LOCK, style(path.display()).dim());
            Arc::new(FileSecretStore::new(path))
        }
        None => Arc::new(InMemorySecretStore::new()),
    };

    let mut engine = PipelineEngine::new(CommandTool::new(tool_config.clone()), store);
    if let Some(home) = &tool_config.home {
        engine = engine.with_tool_provisioning(home, tool_config.provisioned_launcher());
    }

    engine.add_event_handler(|event| {
        println!("{}", format_execution_event(&event));
    });

    // Ctrl-C interrupts the run; stage cleanup still runs
    let interrupt = engine.interrupt_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after cleanup");
            interrupt.trigger();
        }
    });

    let mut run = RunContext::new(workspace);
    for (key, value) in &cmd.env {
        run.set_variable(key, value);
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    println!();
    let success = engine
        .run(&pipeline, &selection, &mut run)
        .await
        .context("Pipeline could not start")?;

    if success {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&pipeline.name).bold(),
            style("successfully").green()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&pipeline.name).bold(),
            style("failed").red()
        );
        error!("Pipeline {} failed", pipeline.name);
    }

    Ok(success)
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<bool> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Stages: {}", style(config.stages.len()).cyan());
            println!("  Environment: {}", style(config.environment.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(true)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(false)
        }
    }
}

fn list_stages(cmd: &StagesCommand) -> Result<bool> {
    let config = PipelineConfig::from_file(&cmd.file)
        .with_context(|| format!("Failed to load pipeline config: {}", cmd.file.display()))?;

    if config.stages.is_empty() {
        println!("{} Pipeline {} has no stages", WARN, style(&config.name).bold());
        return Ok(true);
    }

    println!("{} Stages of {}:", INFO, style(&config.name).bold());
    for line in format_stage_list(&config) {
        println!("{}", line);
    }
    Ok(true)
}
