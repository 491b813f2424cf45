use crate::commands::render::{render, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use saguru_scanners::{
    CancelFlag, DirRepository, FileMetadataStore, KnowledgeBase, MetadataStore, OpenAiClient,
    PipelineConfig, ScanPipeline, ScanProgressEvent,
};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Repository checkout to scan.
    #[arg(value_name = "PATH")]
    pub input: PathBuf,

    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, default_value = "gpt-4o")]
    pub model: String,

    /// Cheap/fast mode: the composite pass contributes no findings.
    #[arg(long)]
    pub fast: bool,

    /// Feed a digest of schema-defining files into the catalogue pass.
    #[arg(long)]
    pub schema_introspection: bool,

    /// Extra knowledge notes (.md/.txt) appended to the built-in corpus.
    #[arg(long)]
    pub knowledge_dir: Option<PathBuf>,

    /// Pipeline configuration YAML; flags override its feature fields.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Record last-scan bookkeeping in this metadata store file.
    #[arg(long)]
    pub metadata_store: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn execute(args: ScanArgs) -> Result<()> {
    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("no API key: pass --api-key or set OPENAI_API_KEY")?;

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("loading pipeline config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if args.fast {
        config.enable_composite = false;
    }
    if args.schema_introspection {
        config.schema_introspection = true;
    }

    let knowledge = match &args.knowledge_dir {
        Some(dir) => KnowledgeBase::with_dir(dir),
        None => KnowledgeBase::builtin(),
    };

    let client = OpenAiClient::with_api_key(api_key, args.model.clone());
    let pipeline = ScanPipeline::new(Arc::new(client))
        .with_config(config)
        .with_knowledge(knowledge);

    if args.verbose {
        eprintln!(
            "{} {} with model {}",
            "🔍 Scanning".bright_blue(),
            args.input.display(),
            args.model
        );
    }

    let verbose = args.verbose;
    let progress = move |event: ScanProgressEvent| {
        if verbose {
            eprintln!(
                "  [{}] {}/{}{}",
                event.phase,
                event.current,
                event.total,
                event
                    .message
                    .map(|m| format!(" — {m}"))
                    .unwrap_or_default()
            );
        }
    };

    let repo = DirRepository::new(&args.input);
    let result = pipeline.run(&repo, &progress, &CancelFlag::new()).await?;

    let rendered = render(&result, args.format)?;
    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if let Some(store_path) = &args.metadata_store {
        let store = FileMetadataStore::open(store_path)?;
        store.ensure_table()?;
        let key = format!("last_scan:{}", args.input.display());
        store.set(&key, &chrono::Utc::now().timestamp().to_string())?;
        store.set(
            &format!("last_finding_count:{}", args.input.display()),
            &result.report_findings().len().to_string(),
        )?;
    }

    if args.verbose {
        eprintln!(
            "{} {} findings ({} raw) in {} ms",
            "✅ Done:".green().bold(),
            result.composite_findings.len(),
            result.findings.len(),
            result.stats.duration_ms
        );
    }

    Ok(())
}
