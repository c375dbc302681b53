///
/// This module implements the CLI interface for vf-dfcx: command parsing, the async
/// entrypoint, and user-visible output.
///
/// All import logic (project model, transformation, synchronisation) lives in the
/// [`vf-dfcx-core`] crate. This module only wires configuration, the HTTP client and
/// the core pipeline together.
///
/// - For command-line users: use the installed `vf-dfcx` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`vf-dfcx-core`]: ../../vf-dfcx-core/
use crate::client::DialogflowClient;
use crate::load_config::{load_config, Overrides};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vf_dfcx_core::project::load_project;
use vf_dfcx_core::synchronise::{synchronise, SynchroniseReport};

/// CLI for vf-dfcx: import a Voiceflow project into Dialogflow CX.
#[derive(Parser)]
#[clap(
    name = "vf-dfcx",
    version,
    about = "Create a Voiceflow project's missing entity types, intents and pages on a Dialogflow CX agent"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload everything the agent does not have yet; existing records are skipped
    Import {
        /// Path to the exported .vf project file
        #[clap(default_value = "project.vf")]
        project: PathBuf,
        /// Path to an optional YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
        /// Also create a flow page per sub-topic
        #[clap(long)]
        pages: bool,
        /// Flow receiving the pages: full resource name or flow id (default: start flow)
        #[clap(long)]
        flow: Option<String>,
    },
}

fn print_report(report: &SynchroniseReport) {
    println!("Import complete.");
    println!(
        "  entity types: {} created, {} skipped",
        report.entity_types.created.len(),
        report.entity_types.skipped.len()
    );
    println!(
        "  intents:      {} created, {} skipped",
        report.intents.created.len(),
        report.intents.skipped.len()
    );
    if let Some(pages) = &report.pages {
        println!(
            "  pages:        {} created, {} skipped",
            pages.created.len(),
            pages.skipped.len()
        );
    }
    println!("Report:");
    println!("{:#?}", report);
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Import {
            project,
            config,
            pages,
            flow,
        } => {
            let project_path = project;
            println!("Reading {}", project_path.display());
            let project = load_project(&project_path)?;

            let config = load_config(config.as_deref(), Overrides { pages, flow })?;
            tracing::info!(command = "import", agent = %config.sync.agent, "Starting import");

            let client = DialogflowClient::connect(&config.client, &config.sync.agent)
                .await
                .context("Failed to construct Dialogflow client")?;

            match synchronise(&project, &client, &config.sync).await {
                Ok(report) => {
                    tracing::info!(command = "import", ?report, "Import complete");
                    print_report(&report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "import", error = %e, "Import failed");
                    Err(anyhow::Error::new(e).context("Import failed"))
                }
            }
        }
    }
}
