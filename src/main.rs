//! # CopyGuard CLI
//!
//! Reviews promotional copy against the rule knowledge base.
//!
//! Usage:
//!   copyguard review --text "本产品能根治脱发"        # Review text
//!   copyguard review --image banner.png --json       # Review an image, JSON output
//!   copyguard status                                 # Knowledge base status
//!   copyguard build rules.md extra.txt               # Rebuild from documents
//!   copyguard add-rules "禁止使用“神效”"              # Append custom rules
//!   copyguard init-config                            # Write a default config

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use copyguard_core::CopyGuardConfig;
use copyguard_knowledge::RuleChunkStore;
use copyguard_review::{MatchSettings, Operation, ReviewService};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "copyguard",
    version,
    about = "Compliance review for promotional copy"
)]
struct Cli {
    /// Config file (default: ~/.copyguard/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Review text and/or an image
    Review {
        /// Copy to review
        #[arg(short, long, default_value = "")]
        text: String,

        /// Image whose text is reviewed as well
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show knowledge base status
    Status,
    /// Rebuild the knowledge base from rule documents
    Build {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Append custom rules to the knowledge base
    AddRules { rules: String },
    /// Rebuild from the configured rules document
    ReloadDoc,
    /// Rebuild from the built-in rule set
    ResetDefault,
    /// Write a default config file
    InitConfig,
}

fn config_path(cli: &Cli) -> PathBuf {
    match &cli.config {
        Some(p) => PathBuf::from(shellexpand::tilde(p).to_string()),
        None => CopyGuardConfig::default_path(),
    }
}

fn load_config(path: &Path) -> Result<CopyGuardConfig> {
    if path.exists() {
        CopyGuardConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(CopyGuardConfig::default())
    }
}

fn build_service(config: &CopyGuardConfig) -> Result<ReviewService> {
    let embedder = copyguard_providers::create_embedder(config)?;
    let completer = copyguard_providers::create_completer(config)?;
    let extractor = copyguard_providers::create_extractor(config)?;
    let store = RuleChunkStore::from_config(embedder, &config.knowledge, config.embedding.timeout())?;

    Ok(
        ReviewService::new(Arc::new(store), completer, MatchSettings::from_config(config))
            .with_extractor(extractor)
            .with_rules_document(config.knowledge.resolved_rules_document())
            .with_ocr_timeout(config.vision.timeout()),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "copyguard=debug,copyguard_core=debug,copyguard_providers=debug,copyguard_knowledge=debug,copyguard_review=debug"
    } else {
        "copyguard=info,copyguard_core=info,copyguard_providers=info,copyguard_knowledge=info,copyguard_review=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let path = config_path(&cli);

    if let Commands::InitConfig = cli.command {
        if path.exists() {
            println!("Config already exists at {}", path.display());
        } else {
            CopyGuardConfig::default().save_to(&path)?;
            println!("Wrote default config to {}", path.display());
        }
        println!(
            "Known providers: {}",
            copyguard_providers::available_providers().join(", ")
        );
        return Ok(());
    }

    let config = load_config(&path)?;
    let service = build_service(&config)?;

    match &cli.command {
        Commands::Build { files } => {
            let (documents, chunks) = service.build_from_files(files).await?;
            println!("Built knowledge base: {chunks} chunk(s) from {documents} document(s)");
            return Ok(());
        }
        Commands::ResetDefault => {
            let chunks = service.store().initialize_default().await?;
            println!("Knowledge base reset to built-in rules: {chunks} chunk(s)");
            return Ok(());
        }
        _ => {}
    }

    let source = service.bootstrap().await?;
    tracing::info!(?source, "knowledge base ready");

    let (operation, json) = match cli.command {
        Commands::Review { text, image, json } => (
            Operation::SmartReview {
                text,
                image_path: image,
            },
            json,
        ),
        Commands::Status => (Operation::KnowledgeStatus, false),
        Commands::AddRules { rules } => (Operation::AddCustomRules { rules }, false),
        Commands::ReloadDoc => (Operation::ReloadRuleDocument, false),
        Commands::Build { .. } | Commands::ResetDefault | Commands::InitConfig => return Ok(()),
    };

    let output = service.dispatch(operation).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{output}");
    }
    Ok(())
}
