use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipsight_captions::{
    format_for_analysis, merge_captions, parse_captions, to_markdown, truncate_for_analysis,
};
use clipsight_common::{logger, AppConfig};
use clipsight_llm::{AnalysisService, AnalysisSettings, JsonFileCache, ProviderGateway};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "clipsight")]
#[command(about = "Clipsight - caption merging and LLM-powered video analysis", long_about = None)]
struct Cli {
    /// Provider id (openai, openai-compatible, gemini, claude)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Reply language tag (e.g. zh, en)
    #[arg(long, global = true)]
    language: Option<String>,

    /// Bypass the analysis cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a caption file (YouTube json3, Bilibili JSON) or plain text
    Summarize {
        input: PathBuf,
    },

    /// Build a mindmap from captions, or from an article when a title is given
    Mindmap {
        input: PathBuf,

        /// Treat the input as an article with this title
        #[arg(long)]
        title: Option<String>,
    },

    /// Merge caption fragments into readable lines
    Merge {
        input: PathBuf,

        /// Emit Markdown instead of JSON
        #[arg(long)]
        markdown: bool,

        /// Markdown document title
        #[arg(long, default_value = "Captions")]
        title: String,
    },

    /// Print the flattened text that would be sent for analysis
    Format {
        input: PathBuf,
    },
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Caption payloads are flattened; anything else is analysed as plain text
fn analysis_text(raw: &str) -> Result<String> {
    match parse_captions(raw) {
        Ok(fragments) => Ok(format_for_analysis(&fragments)?),
        Err(_) => Ok(truncate_for_analysis(raw.trim())),
    }
}

fn build_service(config: &AppConfig, no_cache: bool) -> Result<AnalysisService> {
    let settings = AnalysisSettings::from_config(config)?;
    let timeout = (config.request_timeout_secs > 0)
        .then(|| Duration::from_secs(config.request_timeout_secs));
    let gateway = ProviderGateway::new(timeout)?;

    let mut service = AnalysisService::new(Arc::new(gateway), settings);
    if let Some(path) = config.cache_path.as_ref().filter(|_| !no_cache) {
        service = service.with_cache(Arc::new(JsonFileCache::load(path)?));
    }
    Ok(service)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    // CLI arguments override the environment
    if let Some(provider) = &cli.provider {
        std::env::set_var("LLM_PROVIDER", provider);
    }
    if let Some(language) = &cli.language {
        std::env::set_var("REPLY_LANGUAGE", language);
    }

    let mut config = AppConfig::from_env()?;
    if let Some(model) = &cli.model {
        config.override_model(model);
    }
    config.validate()?;
    config.ensure_directories()?;
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    match cli.command {
        Commands::Summarize { input } => {
            let content = analysis_text(&read_input(&input)?)?;
            let service = build_service(&config, cli.no_cache)?;

            tracing::info!("Summarizing {}", input.display());
            let summary = service.summarize(&content).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Mindmap { input, title } => {
            let raw = read_input(&input)?;
            let service = build_service(&config, cli.no_cache)?;

            tracing::info!("Building mindmap for {}", input.display());
            let doc = match title {
                Some(title) => {
                    service
                        .build_article_mindmap(&title, &truncate_for_analysis(raw.trim()))
                        .await?
                }
                None => service.build_mindmap(&analysis_text(&raw)?).await?,
            };
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Merge {
            input,
            markdown,
            title,
        } => {
            let fragments = parse_captions(&read_input(&input)?)?;
            let merged = merge_captions(&fragments);
            tracing::info!("Merged {} fragments into {} lines", fragments.len(), merged.len());

            if markdown {
                println!("{}", to_markdown(&title, &merged));
            } else {
                println!("{}", serde_json::to_string_pretty(&merged)?);
            }
        }
        Commands::Format { input } => {
            let fragments = parse_captions(&read_input(&input)?)?;
            println!("{}", format_for_analysis(&fragments)?);
        }
    }

    Ok(())
}
