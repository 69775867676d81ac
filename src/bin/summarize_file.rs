use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use docdigest::{config, logging, processing::ProcessingService};

#[derive(Parser)]
#[command(
    name = "summarize-file",
    about = "Run the summarization pipeline over a local file and print the result"
)]
struct Cli {
    /// Path to the document to summarize.
    path: PathBuf,
    /// Declared content type; inferred from the file extension when omitted.
    #[arg(long)]
    content_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::init_config();
    logging::init_tracing();
    let cli = Cli::parse();

    let content_type = match cli.content_type {
        Some(value) => value,
        None => content_type_for(&cli.path)?,
    };
    let display_name = cli
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("upload")
        .to_string();
    let bytes = std::fs::read(&cli.path)
        .with_context(|| format!("failed to read {}", cli.path.display()))?;

    let service = ProcessingService::new();
    let summary = service
        .summarize_document(&bytes, &display_name, &content_type)
        .await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn content_type_for(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("pdf") => Ok("application/pdf".to_string()),
        Some("docx") => Ok(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        ),
        Some("txt") | Some("text") => Ok("text/plain".to_string()),
        _ => bail!(
            "cannot infer content type for {}; pass --content-type",
            path.display()
        ),
    }
}
