//! Campus CLI: validate and upload files to campus storage targets, manage stored objects.
//!
//! Storage settings come from the environment (STORAGE_BACKEND, STORAGE_API_URL, ...).

use anyhow::Context;
use campus_cli::{init_tracing, load_file, path_params, session_report};
use campus_core::{Config, TargetKind, UploadTarget};
use campus_storage::{create_storage, ListOptions};
use campus_upload::{validate, ProgressReporter, UploadService, UploadSettings, UploadState, Verdict};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "campus", about = "Campus storage and upload CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a file against a target's size and type policy (no network)
    Validate {
        /// Path to the file
        file: PathBuf,
        /// course-image, certificate, course-material, avatar or gallery-image
        #[arg(long)]
        target: TargetKind,
    },
    /// Validate and upload a file
    Upload {
        /// Path to the file
        file: PathBuf,
        #[arg(long)]
        target: TargetKind,
        #[arg(long)]
        course_id: Option<String>,
        #[arg(long)]
        student_id: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete an object
    Remove {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        path: String,
    },
    /// List objects directly under a prefix, newest first
    List {
        #[arg(long)]
        bucket: String,
        #[arg(long, default_value = "")]
        prefix: String,
        #[arg(long, default_value = "100")]
        limit: usize,
    },
    /// Print the URL of an object
    Url {
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        path: String,
        /// Create a time-limited signed URL instead of the public one
        #[arg(long)]
        signed: bool,
        /// Signed URL lifetime in seconds (defaults to SIGNED_URL_EXPIRY_SECS)
        #[arg(long)]
        expires: Option<u64>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn upload_service(config: &Config) -> anyhow::Result<UploadService> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage. Check STORAGE_BACKEND and its settings")?;
    Ok(UploadService::new(storage, UploadSettings::from_config(config)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { file, target } => {
            let handle = load_file(&file)?;
            let target = UploadTarget::for_kind(target);
            let report = match validate(&handle, &target) {
                Verdict::Proceed => serde_json::json!({
                    "file": handle.name,
                    "target": target.kind,
                    "verdict": "proceed",
                }),
                Verdict::Rejected(rejection) => serde_json::json!({
                    "file": handle.name,
                    "target": target.kind,
                    "verdict": "rejected",
                    "reason": rejection.to_string(),
                }),
            };
            print_json(&report)?;
        }
        Commands::Upload {
            file,
            target,
            course_id,
            student_id,
            user_id,
            folder,
        } => {
            let config = Config::from_env()?;
            let service = upload_service(&config).await?;
            let handle = load_file(&file)?;
            let params = path_params(course_id, student_id, user_id, folder);

            let mut session = service.select(handle, UploadTarget::for_kind(target), params)?;
            if matches!(session.state(), UploadState::Uploading { .. }) {
                let progress = ProgressReporter::new(config.progress_tick());
                let mut updates = progress.subscribe();
                let watcher = tokio::spawn(async move {
                    while updates.changed().await.is_ok() {
                        let current = *updates.borrow();
                        tracing::debug!(percent = current.percent, "Upload progress");
                    }
                });
                service.upload(&mut session, &progress).await?;
                drop(progress);
                watcher.abort();
            }

            print_json(&session_report(&session))?;
            if !matches!(session.state(), UploadState::Succeeded(_)) {
                std::process::exit(1);
            }
        }
        Commands::Remove { bucket, path } => {
            let config = Config::from_env()?;
            let service = upload_service(&config).await?;
            service.delete_file(&bucket, &path).await?;
            print_json(&serde_json::json!({
                "success": true,
                "message": format!("{}/{} deleted", bucket, path),
            }))?;
        }
        Commands::List {
            bucket,
            prefix,
            limit,
        } => {
            let config = Config::from_env()?;
            let service = upload_service(&config).await?;
            let options = ListOptions {
                limit,
                ..Default::default()
            };
            let entries = service.list_files(&bucket, &prefix, &options).await?;
            print_json(&entries)?;
        }
        Commands::Url {
            bucket,
            path,
            signed,
            expires,
        } => {
            let config = Config::from_env()?;
            let service = upload_service(&config).await?;
            let url = if signed {
                service
                    .download_url(&bucket, &path, expires.map(Duration::from_secs))
                    .await?
            } else {
                service.public_url(&bucket, &path)
            };
            print_json(&serde_json::json!({ "url": url, "signed": signed }))?;
        }
    }

    Ok(())
}
