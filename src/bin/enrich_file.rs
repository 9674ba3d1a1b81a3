use std::{future::Future, path::PathBuf, time::Duration};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use docenrich::{
    config::GenerationProvider,
    extraction::{PdfTextExtractor, TextExtractor},
    generation::{BackendSettings, QuestionGenerator, SummaryGenerator, build_generation_client},
    pipeline::shape_questions,
};
use serde_json::json;

/// Run extraction, summarization and question generation on a local file without touching the
/// document store, then print the result as JSON.
#[derive(Parser)]
#[command(
    name = "enrich-file",
    about = "Enrich a local document and print the result"
)]
struct Cli {
    /// PDF, `.txt` or `.md` file to enrich.
    path: PathBuf,
    /// Organization context for question generation.
    #[arg(long, default_value = "Government of Nepal")]
    organization: String,
    /// `gemini` or `ollama`.
    #[arg(long, env = "GENERATION_PROVIDER", default_value = "gemini")]
    provider: String,
    #[arg(long, env = "GENERATION_MODEL", default_value = "gemini-1.5-flash")]
    model: String,
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,
    #[arg(long, env = "GEMINI_URL")]
    gemini_url: Option<String>,
    #[arg(long, env = "OLLAMA_URL")]
    ollama_url: Option<String>,
    #[arg(long, env = "SUMMARY_CHAR_LIMIT", default_value_t = 10_000)]
    summary_chars: usize,
    #[arg(long, env = "QUESTION_CHAR_LIMIT", default_value_t = 8_000)]
    question_chars: usize,
    #[arg(long, env = "QUESTION_COUNT", default_value_t = 10)]
    questions: usize,
    #[arg(long, env = "SUMMARY_FALLBACK_CHARS", default_value_t = 500)]
    fallback_chars: usize,
    /// Per-call deadline in seconds.
    #[arg(long, env = "CALL_TIMEOUT_SECS", default_value_t = 120)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let provider: GenerationProvider = cli
        .provider
        .parse()
        .map_err(|()| anyhow!("unknown provider '{}'", cli.provider))?;
    let client = build_generation_client(&BackendSettings {
        provider,
        model: cli.model.clone(),
        gemini_api_key: cli.gemini_api_key,
        gemini_url: cli.gemini_url,
        ollama_url: cli.ollama_url,
    })?;
    let deadline = Duration::from_secs(cli.timeout_secs);

    let extracted = within(
        deadline,
        "extraction",
        PdfTextExtractor::new().extract(&cli.path),
    )
    .await?
        .with_context(|| format!("failed to extract {}", cli.path.display()))?;

    let summaries = SummaryGenerator::new(
        client.clone(),
        cli.model.clone(),
        cli.summary_chars,
        cli.fallback_chars,
    );
    let summary = within(deadline, "summary", summaries.summarize(&extracted.text)).await??;
    let degraded_summary = summary.is_degraded();

    let generator = QuestionGenerator::new(client, cli.model, cli.question_chars, cli.questions);
    let outcome = within(
        deadline,
        "questions",
        generator.generate_questions(&extracted.text, &cli.organization),
    )
    .await??;

    let shaped = shape_questions("local", outcome.into_items());
    let summary = summary.into_summary();
    let dropped: Vec<_> = shaped
        .dropped
        .iter()
        .map(|(position, defect)| json!({ "position": position, "reason": defect.to_string() }))
        .collect();
    let report = json!({
        "file": cli.path.display().to_string(),
        "page_count": extracted.page_count,
        "summary": summary.summary,
        "key_points": summary.key_points,
        "degraded_summary": degraded_summary,
        "questions": shaped.accepted,
        "dropped": dropped,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn within<F: Future>(deadline: Duration, label: &str, call: F) -> Result<F::Output> {
    tokio::time::timeout(deadline, call)
        .await
        .map_err(|_| anyhow!("{label} timed out after {deadline:?}"))
}
