use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use breach_investigator::{
    capabilities::{LangbaseHypothesisGenerator, LangbaseTextGenerator},
    cli::{execute_command, Cli, Command},
    config::{Config, LogFormat},
    investigation::InvestigationService,
    langbase::LangbaseClient,
    nvd::NvdClient,
    storage::SqliteStorage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "Breach investigator starting");

    let storage = SqliteStorage::new(&config.database)
        .await
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    let service = build_service(&config, needs_model(&cli.command)).await?;

    let result = execute_command(cli.command, &storage, &service).await;
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Commands that call the model and therefore need provisioned pipes.
fn needs_model(command: &Command) -> bool {
    matches!(
        command,
        Command::Start { .. } | Command::Expand { .. } | Command::Report { .. }
    )
}

/// Wire the Langbase and NVD capabilities into an investigation service.
async fn build_service(config: &Config, provision: bool) -> anyhow::Result<InvestigationService> {
    let langbase = LangbaseClient::new(&config.langbase, config.request.clone())
        .context("building Langbase client")?;
    let generator = LangbaseHypothesisGenerator::new(langbase.clone(), config);
    let text = LangbaseTextGenerator::new(langbase.clone(), config);

    if provision {
        let specs = std::iter::once(generator.pipe_spec()).chain(text.pipe_specs());
        for spec in specs {
            if let Err(e) = langbase.ensure_pipe(&spec).await {
                error!(pipe = %spec.name, error = %e, "Failed to provision pipe");
                return Err(e).with_context(|| format!("provisioning pipe {}", spec.name));
            }
        }
    }

    let search = NvdClient::new(&config.nvd, &config.request).context("building NVD client")?;

    Ok(InvestigationService::from_capabilities(
        Arc::new(generator),
        Arc::new(search),
        Arc::new(text),
        config,
    ))
}

/// Logs go to stderr; stdout carries command output.
fn init_logging(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}
