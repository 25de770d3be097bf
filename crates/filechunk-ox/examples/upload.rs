//! Upload local files to a filechunk endpoint
//!
//! ```bash
//! # Configuration from the environment
//! export FILECHUNK_ENDPOINT=https://example.com/filechunk/upload
//! export FILECHUNK_TOKEN=...
//! cargo run --example upload -- report.pdf photo.jpg
//!
//! # Or from flags, with chunk level logging
//! RUST_LOG=filechunk_ox=debug cargo run --example upload -- \
//!     --endpoint https://example.com/filechunk/upload --token ... --chunk-size 65536 report.pdf
//! ```
//!
//! Ctrl-C cancels every running upload.

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use filechunk_ox::{
    CancellationToken, FieldSettings, Filechunk, LocalFile, UploadContext, UploadField,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "upload")]
#[command(about = "Upload files in resumable chunks")]
struct Args {
    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Upload endpoint; without it all settings come from FILECHUNK_* variables
    #[arg(long)]
    endpoint: Option<String>,

    /// Form token, defaults to FILECHUNK_TOKEN
    #[arg(long)]
    token: Option<String>,

    /// Chunk size in bytes
    #[arg(long)]
    chunk_size: Option<String>,

    /// Form field the files belong to
    #[arg(long)]
    field: Option<String>,

    /// Maximum number of files the field accepts
    #[arg(long)]
    max_count: Option<String>,
}

fn build_context(args: &Args) -> anyhow::Result<UploadContext> {
    let Some(endpoint) = args.endpoint.clone() else {
        return UploadContext::load_from_env().context("loading FILECHUNK_* configuration");
    };
    let token = match args.token.clone() {
        Some(token) => token,
        None => std::env::var("FILECHUNK_TOKEN").context("--token or FILECHUNK_TOKEN is required")?,
    };

    Ok(UploadContext::builder()
        .endpoint(endpoint)
        .token(token)
        .maybe_chunk_size(args.chunk_size.clone())
        .maybe_field_name(args.field.clone())
        .build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let context = build_context(&args)?.with_progress(|percent, message| match message {
        Some(message) => eprintln!("{message}"),
        None => eprintln!("{percent:>3}%"),
    });

    let max_count = args.max_count.clone().map(serde_json::Value::String);
    let settings = FieldSettings::new(true, max_count.as_ref())?;

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = LocalFile::open(path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        files.push(file);
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling uploads");
            on_signal.cancel();
        }
    });

    let mut field = UploadField::new(settings);
    let results = field
        .upload_files_with_cancel(&Filechunk::new(), &files, &context, &cancel)
        .await?;

    let mut failed = 0;
    for (file, result) in files.iter().zip(&results) {
        match result {
            Ok(item) => tracing::info!(path = %file.path().display(), id = item.id(), "uploaded"),
            Err(e) => {
                failed += 1;
                tracing::error!(path = %file.path().display(), error = %e, "upload failed");
            }
        }
    }

    println!("{}", field.value());

    if failed > 0 {
        anyhow::bail!("{failed} of {} uploads failed", files.len());
    }
    Ok(())
}
