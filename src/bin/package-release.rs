//! Package Release CLI
//!
//! Publishes a project release to a package registry, or reverts one

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use package_release::core::ArchiveBuilder;
use package_release::core::config::{
    AuthConfig, PublishConfig, PublishOptionsConfig, RegistryConfig,
};
use package_release::core::config_loader::{ConfigLoadOptions, ConfigLoader};
use package_release::{
    Credentials, PreparedRelease, Project, PublishError, RegistryClient, ReleasePublisher,
    TarballBuilder, TerminalConsole,
};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "PACKAGE_RELEASE_LOG";

/// Publish package releases to a package registry
#[derive(Parser)]
#[command(name = "package-release")]
#[command(version)]
#[command(about = "Publish package releases to a package registry", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the current version, or revert a published one
    Publish {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Delete the given published version instead of publishing
        #[arg(long, value_name = "VERSION")]
        revert: Option<String>,

        /// Skip the confirmation prompt (CI/CD)
        #[arg(short, long)]
        yes: bool,

        /// Registry API URL
        #[arg(long, value_name = "URL")]
        registry_url: Option<String>,

        /// Registry API key
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,
    },

    /// Build the release tarball locally without publishing
    Build {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Output file (defaults to <name>-<version>.tar in the project root)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            if let Some(publish_error) = e.downcast_ref::<PublishError>() {
                for action in publish_error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
            }
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            project_path,
            revert,
            yes,
            registry_url,
            api_key,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            let cli_args = cli_config(registry_url, api_key, yes);
            publish_command(path, cli_args, revert).await
        }
        Commands::Build {
            project_path,
            output,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            build_command(path, output).await
        }
    }
}

/// Configuration layer built from command-line flags
fn cli_config(registry_url: Option<String>, api_key: Option<String>, yes: bool) -> PublishConfig {
    PublishConfig {
        registry: registry_url.map(|url| RegistryConfig {
            url: Some(url),
            timeout_secs: None,
        }),
        auth: api_key.map(|key| AuthConfig {
            api_key: Some(key),
            ..Default::default()
        }),
        publish: yes.then_some(PublishOptionsConfig {
            confirm: Some(false),
        }),
    }
}

async fn publish_command(
    project_path: PathBuf,
    cli_args: PublishConfig,
    revert: Option<String>,
) -> Result<i32> {
    println!("\n📦 package-release\n");

    let config = ConfigLoader::load(ConfigLoadOptions {
        project_path: project_path.clone(),
        cli_args: Some(cli_args),
        env: std::env::vars().collect(),
    })
    .await?;

    let project = Project::load(&project_path).await?;
    let credentials = Credentials::from_config(config.auth.as_ref())?;
    let client = RegistryClient::from_config(&config)?;
    let archiver = TarballBuilder::new(&project.root);
    let console = TerminalConsole::new(!config.confirm());

    tracing::info!(
        registry = %client.base_url(),
        auth = %credentials.describe(),
        "starting run"
    );

    let mut publisher = ReleasePublisher::new(&client, &archiver, &console);
    let outcome = match revert {
        Some(version) => {
            publisher
                .revert(&project.config.name, &version, &credentials)
                .await?
        }
        None => {
            publisher.publish(&project, &credentials).await?
        }
    };

    tracing::debug!(
        elapsed_ms = publisher.state().elapsed_millis(),
        history = %publisher.state().history(),
        "run finished"
    );

    // Rejections were already reported by the console
    Ok(if outcome.is_success() { 0 } else { 1 })
}

async fn build_command(project_path: PathBuf, output: Option<PathBuf>) -> Result<i32> {
    let project = Project::load(&project_path).await?;
    let prepared = PreparedRelease::from_project(&project)?;

    for line in prepared.report() {
        println!("{}", line);
    }

    let archive = TarballBuilder::new(&project.root)
        .build(&prepared.metadata, &prepared.metadata.files)?;

    let output = output.unwrap_or_else(|| {
        project.root.join(format!(
            "{}-{}.tar",
            prepared.metadata.name, prepared.metadata.version
        ))
    });
    tokio::fs::write(&output, &archive)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("\n✅ Built {} ({} bytes)", output.display(), archive.len());
    Ok(0)
}
