use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use result_sink::cli::Args;
use result_sink::{collect, logging};
use tokio_util::sync::CancellationToken;

/// How long in-flight store attempts get to finish once the run is over.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let result = rt.block_on(async {
        let cancel_token = CancellationToken::new();

        // Handle Ctrl+C gracefully
        let cancel_clone = cancel_token.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            cancel_clone.cancel();
        });

        collect::run(&args, cancel_token).await
    });

    // A reader blocked on stdin would otherwise keep the process alive
    rt.shutdown_timeout(SHUTDOWN_GRACE);
    result
}
