//! blobscan CLI.
//!
//! Scans one local file and prints the result envelope as JSON.

use anyhow::{Context, Result};
use blobscan::{ScanResult, ScannerConfig, ScannerSession};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How the file reaches the backend.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    /// Multipart HTTP upload.
    Upload,
    /// Local path over the session channel.
    File,
    /// Streamed bytes over the session channel.
    Stream,
}

/// Scan a file with the anti-malware backend configured by AMAAS_* variables.
#[derive(Parser, Debug)]
#[command(name = "blobscan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to scan.
    path: PathBuf,

    /// Name reported to the backend instead of the file's base name.
    #[arg(short, long)]
    name: Option<String>,

    /// Transport strategy.
    #[arg(short, long, value_enum, default_value = "file")]
    strategy: Strategy,

    /// Override the multipart upload endpoint.
    #[arg(long, env = "BLOBSCAN_UPLOAD_ENDPOINT")]
    upload_endpoint: Option<String>,

    /// Override the session channel endpoint.
    #[arg(long, env = "BLOBSCAN_RPC_ENDPOINT")]
    rpc_endpoint: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

impl Args {
    fn config(&self) -> Result<ScannerConfig> {
        let mut config = ScannerConfig::from_env().context("Invalid scanner configuration")?;
        if let Some(endpoint) = &self.upload_endpoint {
            config = config.with_upload_endpoint(endpoint.clone());
        }
        if let Some(endpoint) = &self.rpc_endpoint {
            config = config.with_rpc_endpoint(endpoint.clone());
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}

async fn scan(session: &ScannerSession, args: &Args) -> Result<ScanResult> {
    let result = match args.strategy {
        Strategy::Upload => session.upload_file(&args.path, args.name.as_deref()).await?,
        Strategy::File => session.scan_file(&args.path).await?,
        Strategy::Stream => {
            let file = tokio::fs::File::open(&args.path)
                .await
                .with_context(|| format!("Failed to open {}", args.path.display()))?;
            let name = blobscan::transport::upload::display_name(&args.path, args.name.as_deref());
            session.scan_stream(file, &name).await?
        }
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = args.config()?;

    info!(
        path = %args.path.display(),
        strategy = ?args.strategy,
        region = %config.region(),
        "Starting scan"
    );

    let mut session = ScannerSession::open(config).await?;
    let outcome = scan(&session, &args).await;
    session.close().await;
    let result = outcome?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(match (result.is_clean(), result.error()) {
        (true, _) => ExitCode::SUCCESS,
        (false, None) => ExitCode::from(1),
        (false, Some(_)) => ExitCode::from(2),
    })
}
