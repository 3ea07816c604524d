//! `chw-core` — CLI entry point. Ingestion and serving are external
//! collaborators by spec: this binary fixes the interface, not an
//! elaborate UX (no progress bars, no ablation harness).

use anyhow::Context as _;
use chw_clinical_core::config::CoreConfig;
use chw_clinical_core::context::Context;
use chw_clinical_core::pipeline;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "chw-core", about = "Hybrid retrieval and synthesis core for CHW clinical guidelines")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Offline ingestion: PDF -> chunks -> embeddings -> indices.
    Pipeline {
        pdf: PathBuf,
        #[arg(long, short = 'o', default_value = "data/databases/guidelines.db")]
        output: PathBuf,
        #[arg(long)]
        no_ocr: bool,
        #[arg(long, default_value_t = 32)]
        batch_size: usize,
        #[arg(long, default_value = "cpu")]
        device: String,
        #[arg(long, default_value_t = 3000)]
        max_tokens: usize,
    },
    /// Serve a single clinical question through the query pipeline.
    Synthesis {
        #[arg(long)]
        query: String,
        #[arg(long)]
        search_only: bool,
        #[arg(long)]
        no_guardrail: bool,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value = "data/databases/guidelines.db")]
        db: PathBuf,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        url: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Pipeline {
            pdf,
            output,
            no_ocr: _,
            batch_size: _,
            device,
            max_tokens,
        } => run_pipeline(pdf, output, max_tokens, device),
        Command::Synthesis {
            query,
            search_only,
            no_guardrail,
            top_k,
            db,
            model,
            url,
        } => run_synthesis(query, search_only, no_guardrail, top_k, db, model, url),
    };

    match result {
        Ok(()) => ExitCode::from(0),
        Err(CliError::InvalidInput(msg)) => {
            eprintln!("Error: {msg}");
            ExitCode::from(1)
        }
        Err(CliError::PipelineFailure(err)) => {
            eprintln!("Error: pipeline failed: {err:#}");
            ExitCode::from(2)
        }
    }
}

enum CliError {
    InvalidInput(String),
    PipelineFailure(anyhow::Error),
}

fn run_pipeline(pdf: PathBuf, output: PathBuf, max_tokens: usize, device: String) -> Result<(), CliError> {
    if !pdf.exists() {
        return Err(CliError::InvalidInput(format!(
            "PDF file not found: {}",
            pdf.display()
        )));
    }

    (|| -> anyhow::Result<()> {
        let mut config = CoreConfig::default();
        config.store.db_path = output.clone();
        config.embedding.device = device;
        config.validate().map_err(anyhow::Error::msg)?;

        let ctx = Context::new(config).context("failed to build context")?;
        let stats = pipeline::run_ingest_pipeline(&ctx, &pdf, max_tokens).context("ingestion failed")?;

        println!("Document ID: {}", stats.doc_id);
        println!("Pages:       {}", stats.pages);
        println!("Chunks:      {}", stats.chunks);
        println!("Embeddings:  {}", stats.embeddings);
        println!("Database:    {}", output.display());
        Ok(())
    })()
    .map_err(CliError::PipelineFailure)
}

fn run_synthesis(
    query: String,
    search_only: bool,
    no_guardrail: bool,
    top_k: usize,
    db: PathBuf,
    model: Option<String>,
    url: Option<String>,
) -> Result<(), CliError> {
    if query.trim().is_empty() {
        return Err(CliError::InvalidInput("--query must not be empty".to_string()));
    }

    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::PipelineFailure(e.into()))?;

    runtime
        .block_on(async move {
            let mut config = CoreConfig::default();
            config.store.db_path = db;
            if let Some(model) = model {
                config.backend.model = model;
            }
            if let Some(url) = url {
                config.backend.base_url = url;
            }
            config.validate().map_err(anyhow::Error::msg)?;

            let ctx = Context::new(config)?;

            let result = if search_only {
                pipeline::query_search_only(&ctx, &query, top_k)?
            } else {
                pipeline::query(&ctx, &query, top_k, !no_guardrail).await?
            };

            print_result(&result);
            Ok(())
        })
        .map_err(CliError::PipelineFailure)
}

fn print_result(result: &chw_clinical_core::types::SynthesisResult) {
    println!("QUERY: {}", result.query);
    if !result.alerts.is_empty() {
        let high: Vec<&str> = result
            .alerts
            .iter()
            .filter(|a| a.severity == chw_clinical_core::types::Severity::High)
            .map(|a| a.term.as_str())
            .collect();
        if !high.is_empty() {
            println!("DANGER SIGNS: {}", high.join(", "));
        }
    }
    println!("\nSUMMARY:\n{}", result.summary);
    if let Some(passed) = result.guardrail_passed {
        println!("\nGuardrail: {}", if passed { "PASSED" } else { "FAILED" });
    }
    println!(
        "\nTiming: search={:.0}ms synth={:.0}ms total={:.0}ms",
        result.timings.search_ms, result.timings.synth_ms, result.timings.total_ms
    );
}
