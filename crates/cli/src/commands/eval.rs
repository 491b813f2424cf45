use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use saguru_scanners::{
    eval, CancelFlag, DirRepository, MatchReport, OpenAiClient, PipelineConfig, ScanPipeline,
};

#[derive(Args, Debug)]
pub struct EvalArgs {
    /// Fixture repository to scan.
    #[arg(value_name = "FIXTURES")]
    pub fixtures: PathBuf,

    /// Group spec file or directory (JSON/YAML).
    #[arg(long)]
    pub spec: PathBuf,

    /// Run only the group with this id.
    #[arg(long)]
    pub group: Option<String>,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long, default_value = "gpt-4o")]
    pub model: String,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub verbose: bool,
}

pub async fn execute(args: EvalArgs) -> Result<()> {
    let mut specs = eval::load_specs(&args.spec)
        .with_context(|| format!("loading eval specs from {}", args.spec.display()))?;
    if let Some(group) = &args.group {
        specs.retain(|s| &s.id == group);
        if specs.is_empty() {
            anyhow::bail!("no eval group named '{group}'");
        }
    }

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .context("no API key: pass --api-key or set OPENAI_API_KEY")?;

    let config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };

    let client = OpenAiClient::with_api_key(api_key, args.model.clone());
    let pipeline = ScanPipeline::new(Arc::new(client)).with_config(config);

    let repo = DirRepository::new(&args.fixtures);
    let result = pipeline
        .run(&repo, &saguru_scanners::pipeline::NullSink, &CancelFlag::new())
        .await?;

    let mut failed = 0usize;
    for spec in &specs {
        let report = eval::match_result(&result, spec);
        print_report(&report, spec.description.as_str(), args.verbose);
        if !report.passed() {
            failed += 1;
        }
    }

    println!(
        "\n{} {}/{} groups passed",
        if failed == 0 { "✅".to_string() } else { "❌".to_string() },
        specs.len() - failed,
        specs.len()
    );

    if failed > 0 {
        anyhow::bail!("{failed} of {} eval groups failed", specs.len());
    }
    Ok(())
}

fn print_report(report: &MatchReport, description: &str, verbose: bool) {
    let status = if report.passed() {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "[{}] {} — {} ({} matched, {} missed, {} unexpected)",
        status,
        report.group_id,
        description,
        report.matched.len(),
        report.missed.len(),
        report.unexpected.len()
    );

    if !verbose {
        return;
    }

    for matched in &report.matched {
        println!(
            "    {} {} ← {}",
            "✓".green(),
            matched.expected.expectation,
            matched.finding.summary
        );
    }
    for missed in &report.missed {
        println!(
            "    {} missed: {} at {}",
            "✗".red(),
            missed.expectation,
            missed.filepath
        );
    }
    for unexpected in &report.unexpected {
        let location = unexpected
            .location
            .as_ref()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "repository-wide".to_string());
        println!("    {} unexpected: {} at {}", "!".yellow(), unexpected.summary, location);
    }
}
