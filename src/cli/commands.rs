//! CLI command definitions for reel-forge.
//!
//! `generate` runs the full pipeline for a brief file and writes the video
//! plan; `critique` re-scores a saved pipeline state offline.

use crate::agents::critic::{Critic, CriticConfig, CritiqueReport};
use crate::agents::orchestrator::{Orchestrator, PipelineEvent, PipelinePhase};
use crate::agents::types::{Brief, PipelineState, TemplateMode};
use crate::llm::{LiteLlmClient, LlmProvider, DEFAULT_MODEL, OPENROUTER_API_BASE};
use crate::pipeline::PipelineConfig;
use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Marketing-video plan generator.
#[derive(Parser)]
#[command(name = "reel-forge")]
#[command(about = "Turn a product brief into a structured marketing-video plan")]
#[command(version)]
#[command(
    long_about = "reel-forge prompts an LLM through a fixed cast of agents (scriptwriter, art director, director, sound designer) and a critic, then assembles a video plan for a renderer.\n\nExample usage:\n  reel-forge generate --brief brief.yaml --template viable --output plan.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a video plan from a brief.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Re-score a saved pipeline state without calling the LLM.
    Critique(CritiqueArgs),
}

/// Arguments for `reel-forge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Brief file (JSON or YAML).
    #[arg(short = 'b', long)]
    pub brief: PathBuf,

    /// Output branch: "freeform" or "viable".
    #[arg(short = 't', long, default_value = "freeform")]
    pub template: TemplateMode,

    /// Write the plan here instead of stdout.
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Also write the final pipeline state (for `critique`).
    #[arg(long)]
    pub state_out: Option<PathBuf>,

    /// LLM model to use.
    #[arg(short = 'm', long, env = "PIPELINE_DEFAULT_MODEL")]
    pub model: Option<String>,

    /// OpenRouter API key (can also be set via OPENROUTER_API_KEY or LITELLM_API_KEY env var).
    #[arg(long, env = "OPENROUTER_API_KEY")]
    pub api_key: Option<String>,

    /// Override the refinement bound.
    #[arg(long)]
    pub max_refinements: Option<u32>,

    /// Print a JSON run summary instead of progress lines.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `reel-forge critique`.
#[derive(Parser, Debug)]
pub struct CritiqueArgs {
    /// Saved pipeline state (from `generate --state-out`).
    #[arg(short = 's', long)]
    pub state: PathBuf,

    /// Pass score for template runs.
    #[arg(long)]
    pub template_threshold: Option<f64>,

    /// Pass score for freeform runs.
    #[arg(long)]
    pub freeform_threshold: Option<f64>,

    /// Output the report as JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Summary printed after `generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub status: String,
    pub run_id: String,
    pub template: String,
    pub quality_score: f64,
    pub refinements: u32,
    pub scenes: usize,
    pub total_duration_secs: f64,
    pub recovered_steps: usize,
    pub diagnostics: Vec<String>,
    pub output_path: Option<String>,
    pub duration_ms: u64,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate_command(args).await,
        Commands::Critique(args) => run_critique_command(args),
    }
}

// ============================================================================
// Generate
// ============================================================================

async fn run_generate_command(args: GenerateArgs) -> anyhow::Result<()> {
    let brief = load_brief(&args.brief)?;

    let mut config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    if let Some(model) = args.model.clone() {
        config = config.with_default_model(model);
    }
    if let Some(max) = args.max_refinements {
        config = config.with_max_refinements(max);
    }
    config.validate().context("Invalid pipeline configuration")?;

    let llm_client = build_llm_client(args.api_key.clone(), config.default_model.clone())?;
    let orchestrator = Orchestrator::new(llm_client, config);

    info!(
        product = %brief.product_name,
        template = %args.template,
        "Generating video plan"
    );

    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(64);
    let quiet = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if quiet {
                continue;
            }
            if let Some(line) = describe_event(&event) {
                eprintln!("{}", line);
            }
        }
    });

    let run = orchestrator
        .run_with_events(brief, args.template, event_tx)
        .await;
    join_printer(printer).await;

    let plan_json = serde_json::to_string_pretty(&run.plan)?;
    match &args.output {
        Some(path) => write_file(path, &plan_json)?,
        None if !args.json => println!("{}", plan_json),
        None => {}
    }

    if let Some(path) = &args.state_out {
        write_file(path, &serde_json::to_string_pretty(&run.state)?)?;
    }

    let summary = GenerationSummary {
        status: if run.state.needs_refinement {
            "below_threshold".to_string()
        } else {
            "passed".to_string()
        },
        run_id: run.state.run_id().to_string(),
        template: run.plan.template.clone(),
        quality_score: run.state.quality_score,
        refinements: run.state.refinement_count,
        scenes: run.plan.scenes().len(),
        total_duration_secs: run.plan.total_duration,
        recovered_steps: run.recovered_count(),
        diagnostics: run.state.errors().to_vec(),
        output_path: args.output.as_ref().map(|p| p.display().to_string()),
        duration_ms: run.total_duration_ms,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Reads a brief from JSON or YAML, chosen by file extension.
pub fn load_brief(path: &Path) -> anyhow::Result<Brief> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read brief {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let brief: Brief = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML brief {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON brief {}", path.display()))?
    };

    if brief.product_name.trim().is_empty() {
        anyhow::bail!("Brief {} has an empty productName", path.display());
    }

    Ok(brief)
}

/// Resolves the LLM client: explicit key first (OpenRouter unless
/// `LITELLM_API_BASE` points elsewhere), then the LiteLLM environment.
fn build_llm_client(
    api_key: Option<String>,
    model: Option<String>,
) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let resolved_api_key = api_key
        .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
        .or_else(|| std::env::var("LITELLM_API_KEY").ok());

    let client = if let Some(key) = resolved_api_key {
        let api_base = std::env::var("LITELLM_API_BASE")
            .unwrap_or_else(|_| OPENROUTER_API_BASE.to_string());
        let model = model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());
        info!(model = %model, api_base = %api_base, "Using API key client");
        LiteLlmClient::new(api_base, Some(key), model)
    } else {
        info!("Using LiteLLM client from environment");
        let client = LiteLlmClient::from_env().map_err(|e| {
            anyhow::anyhow!(
                "Failed to initialize LLM client: {}. Please provide --api-key or set \
                 OPENROUTER_API_KEY/LITELLM_API_KEY env var.",
                e
            )
        })?;
        match model {
            Some(model) => client.with_default_model(model),
            None => client,
        }
    };

    Ok(Arc::new(client))
}

/// One progress line per interesting event.
/// Waits for the progress printer. Returns false if the task panicked or was
/// cancelled; the plan is still written in that case.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Progress printer task failed");
            false
        }
    }
}

fn describe_event(event: &PipelineEvent) -> Option<String> {
    match event {
        PipelineEvent::PhaseChanged { phase, .. } => match phase {
            PipelinePhase::Critiquing => Some("→ critiquing".to_string()),
            PipelinePhase::Done => Some("→ assembling plan".to_string()),
            _ => None,
        },
        PipelineEvent::StageStarted { stage, pass, .. } => Some(if *pass == 0 {
            format!("  {}...", stage)
        } else {
            format!("  {} (refinement {})...", stage, pass)
        }),
        PipelineEvent::StageCompleted {
            stage, duration_ms, ..
        } => Some(format!("  ✓ {} ({} ms)", stage, duration_ms)),
        PipelineEvent::StageRecovered {
            stage, diagnostic, ..
        } => Some(format!("  ! {} used fallback: {}", stage, diagnostic)),
        PipelineEvent::CritiqueComplete {
            score,
            needs_refinement,
            issues,
            ..
        } => Some(format!(
            "  score {:.2} ({} issues){}",
            score,
            issues,
            if *needs_refinement { ", below threshold" } else { "" }
        )),
        PipelineEvent::RefinementStarted {
            pass,
            max_refinements,
            ..
        } => Some(format!("→ refinement {}/{}", pass, max_refinements)),
        PipelineEvent::PipelineComplete { .. } => None,
    }
}

fn print_summary(summary: &GenerationSummary) {
    eprintln!();
    eprintln!("Run:          {}", summary.run_id);
    eprintln!("Template:     {}", summary.template);
    eprintln!("Score:        {:.2} ({})", summary.quality_score, summary.status);
    eprintln!("Refinements:  {}", summary.refinements);
    eprintln!(
        "Scenes:       {} ({:.1}s)",
        summary.scenes, summary.total_duration_secs
    );
    if let Some(path) = &summary.output_path {
        eprintln!("Plan written: {}", path);
    }
    if !summary.diagnostics.is_empty() {
        eprintln!("Diagnostics:");
        for line in &summary.diagnostics {
            eprintln!("  - {}", line);
        }
    }
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

// ============================================================================
// Critique
// ============================================================================

fn run_critique_command(args: CritiqueArgs) -> anyhow::Result<()> {
    let report = critique_state_file(
        &args.state,
        args.template_threshold,
        args.freeform_threshold,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} score {:.2} (threshold {:.2}): {}",
        report.mode,
        report.score,
        report.threshold,
        if report.passed() { "passed" } else { "needs refinement" }
    );
    for issue in &report.issues {
        println!("  -{:>3}  {}  [{}]", issue.penalty, issue.message, issue.rule);
    }
    Ok(())
}

/// Loads a saved state and scores it with the given thresholds.
pub fn critique_state_file(
    path: &Path,
    template_threshold: Option<f64>,
    freeform_threshold: Option<f64>,
) -> anyhow::Result<CritiqueReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state {}", path.display()))?;
    let state: PipelineState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state {}", path.display()))?;

    let mut config = CriticConfig::default();
    if let Some(threshold) = template_threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&threshold),
            "--template-threshold must be between 0.0 and 1.0"
        );
        config = config.with_template_threshold(threshold);
    }
    if let Some(threshold) = freeform_threshold {
        anyhow::ensure!(
            (0.0..=1.0).contains(&threshold),
            "--freeform-threshold must be between 0.0 and 1.0"
        );
        config = config.with_freeform_threshold(threshold);
    }

    Ok(Critic::new(config).evaluate(&state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::critic::RuleId;
    use crate::agents::step::PipelineStage;
    use crate::agents::types::Scene;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "reel-forge",
            "generate",
            "--brief",
            "brief.yaml",
            "--template",
            "viable",
            "-o",
            "plan.json",
        ])
        .expect("valid arguments");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.template, TemplateMode::Viable);
                assert_eq!(args.brief, PathBuf::from("brief.yaml"));
                assert_eq!(args.output, Some(PathBuf::from("plan.json")));
            }
            Commands::Critique(_) => panic!("expected generate"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_cli_rejects_unknown_template() {
        let result = Cli::try_parse_from([
            "reel-forge",
            "generate",
            "--brief",
            "b.json",
            "--template",
            "cinematic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_brief_json_and_yaml() {
        let dir = TempDir::new().expect("temp dir");

        let json_path = dir.path().join("brief.json");
        fs::write(
            &json_path,
            r#"{"productName": "Lumen", "tone": "playful", "referenceMedia": [{"url": "https://x/y.png"}]}"#,
        )
        .expect("write json");
        let brief = load_brief(&json_path).expect("json brief");
        assert_eq!(brief.product_name, "Lumen");
        assert_eq!(brief.reference_media.len(), 1);

        let yaml_path = dir.path().join("brief.yml");
        fs::write(
            &yaml_path,
            "productName: Lumen\ndescription: Calm planning\ncallToAction: Try it\n",
        )
        .expect("write yaml");
        let brief = load_brief(&yaml_path).expect("yaml brief");
        assert_eq!(brief.call_to_action, "Try it");
    }

    #[test]
    fn test_load_brief_rejects_missing_name() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("brief.json");
        fs::write(&path, r#"{"productName": "  "}"#).expect("write");

        let err = load_brief(&path).unwrap_err();
        assert!(err.to_string().contains("empty productName"));
    }

    #[test]
    fn test_critique_state_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut state = PipelineState::new(Brief::new("Lumen", "Plans"), TemplateMode::Freeform);
        state.scenes = vec![Scene::new("scene-1", None, "Untitled", 3.0)];
        let path = dir.path().join("state.json");
        fs::write(&path, serde_json::to_string(&state).expect("serialize")).expect("write");

        let report = critique_state_file(&path, None, Some(0.1)).expect("report");

        assert_eq!(report.mode, TemplateMode::Freeform);
        assert!(report.issues.iter().any(|i| i.rule == RuleId::SceneTypeMissing));
        // script 20 + type 10 + palette 10 + audio 10
        assert!((report.score - 0.5).abs() < 1e-9);
        assert!(report.passed());
    }

    #[test]
    fn test_critique_rejects_bad_threshold() {
        let dir = TempDir::new().expect("temp dir");
        let state = PipelineState::new(Brief::new("Lumen", ""), TemplateMode::Viable);
        let path = dir.path().join("state.json");
        fs::write(&path, serde_json::to_string(&state).expect("serialize")).expect("write");

        assert!(critique_state_file(&path, Some(2.0), None).is_err());
    }

    #[test]
    fn test_write_file_creates_parent_dirs() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested/out/plan.json");
        write_file(&path, "{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
    }

    #[test]
    fn test_describe_event() {
        let line = describe_event(&PipelineEvent::stage_recovered(
            PipelineStage::ArtDirector,
            "palette fallback used (offline)",
            12,
        ))
        .expect("line");
        assert!(line.contains("Art Director used fallback"));

        assert!(describe_event(&PipelineEvent::phase_changed(PipelinePhase::Init)).is_none());
    }

    #[tokio::test]
    async fn test_join_printer_reports_failed_task() {
        assert!(join_printer(tokio::spawn(async {})).await);

        let crashed = tokio::spawn(async { panic!("printer crashed") });
        assert!(!join_printer(crashed).await);

        let stalled = tokio::spawn(std::future::pending::<()>());
        stalled.abort();
        assert!(!join_printer(stalled).await);
    }
}
