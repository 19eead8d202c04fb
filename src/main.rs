//! Command-line entry point for the token deletion sweep.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use tokensweep::config::{ResponseMode, RunConfig, DEFAULT_CHUNK_SIZE, DEFAULT_ENDPOINT};
use tokensweep::http::ReqwestHttpClient;
use tokensweep::persist::StopCause;
use tokensweep::{run, signal};

#[derive(Debug, Parser)]
#[command(
    name = "tokensweep",
    version,
    about = "Delete payment tokens in bulk, recording results next to the input"
)]
struct Cli {
    /// CSV roster of tokens to delete; must carry a `payment_token` column
    #[arg(long)]
    csv_path: PathBuf,

    /// Credential sent as `Authorization: Basic <token>`
    #[arg(long, env = "TOKENSWEEP_AUTH_TOKEN", hide_env_values = true)]
    auth_token: String,

    /// Tokens submitted per request
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Pause before each request, in milliseconds
    #[arg(long, default_value_t = 0)]
    time_ms_between_requests: u64,

    /// Deletion endpoint receiving one POST per chunk
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-request timeout in milliseconds; unbounded when omitted
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// How responses attribute success to individual tokens
    #[arg(long, value_enum, default_value = "per-token")]
    response_mode: ResponseMode,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            csv_path: self.csv_path,
            auth_token: self.auth_token,
            endpoint: self.endpoint,
            chunk_size: self.chunk_size,
            time_ms_between_requests: self.time_ms_between_requests,
            request_timeout_ms: self.request_timeout_ms,
            response_mode: self.response_mode,
        }
    }
}

/// Initialize logging to stderr, respecting `RUST_LOG` and defaulting to
/// `info`.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let config = Cli::parse().into_config();

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        signal::shutdown_signal().await;
        signal_token.cancel();
    });

    match run::execute(config, ReqwestHttpClient::new(), shutdown).await {
        Ok(summary) => match summary.stop_cause {
            StopCause::Completed => ExitCode::SUCCESS,
            // Conventional code for termination by SIGINT
            StopCause::Interrupted => ExitCode::from(130),
            StopCause::Faulted => ExitCode::FAILURE,
        },
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
