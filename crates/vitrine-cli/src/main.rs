//! Vitrine CLI: uploads images to the Vitrine API in chunks.
//!
//! Set VITRINE_API_URL (or API_URL). VITRINE_CHUNK_SIZE and VITRINE_MAX_RETRIES set the
//! defaults that the flags override.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use vitrine_api_client::{ApiClient, UploadSessionController, UploadSettings};
use vitrine_cli::{init_tracing, report_json};

#[derive(Parser)]
#[command(name = "vitrine", about = "Vitrine gallery upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image in chunks, falling back to a single request on failure
    Upload {
        /// Path to the image
        file: std::path::PathBuf,
        /// Chunk size in bytes (0 sends the whole file at once)
        #[arg(long)]
        chunk_size: Option<u64>,
        /// Retries per chunk
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Normalize an already merged image under the server's tmp media directory
    Finalize {
        /// Relative path, e.g. p/h/photo.jpg
        file: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let client = ApiClient::from_env().context("Create API client (set VITRINE_API_URL)")?;

    match cli.command {
        Commands::Upload {
            file,
            chunk_size,
            max_retries,
        } => {
            let mut settings = UploadSettings::from_env()?;
            if let Some(size) = chunk_size {
                settings.chunk_size = (size > 0).then_some(size);
            }
            if let Some(retries) = max_retries {
                settings.max_retries = retries;
            }

            let controller = UploadSessionController::new(client, settings)
                .with_notice_handler(|notice| eprintln!("{}", notice));
            let report = controller.upload_file(&file).await?;

            print_json(&report_json(&report))?;
            if !report.is_complete() {
                std::process::exit(1);
            }
        }
        Commands::Finalize { file } => {
            let response = client.finalize_gallery_image(&file).await?;
            print_json(&response)?;
            if matches!(
                response,
                vitrine_core::models::GalleryUploadResponse::Failure { .. }
            ) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
