use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::reader::{start_read, ReadEvent};
use crate::chunk::check_size;
use crate::cli::Args;
use crate::sink::{ResultSink, SinkError};
use crate::summary::{category_of, print_summary, to_json, Tally};

pub async fn run(args: &Args, cancel_token: CancellationToken) -> Result<()> {
    // Reject a bad batch size before the store is touched
    let batch_size = check_size(args.batch_size)?;
    let concurrency = args.effective_concurrency();

    let sink = ResultSink::new(&args.output, args.sink_config()).with_cancel(cancel_token.clone());
    info!(
        store = %sink.path().display(),
        concurrency,
        batch_size = batch_size.get(),
        "collecting results"
    );

    let rx = start_read(args.read_options(batch_size), cancel_token.clone());
    let tally = collect(&sink, rx, concurrency, &args.category_key, &cancel_token).await?;

    info!(
        written = tally.written(),
        malformed = tally.malformed_inputs,
        elapsed_secs = tally.elapsed_secs(),
        "collection finished"
    );

    if args.json {
        println!("{}", to_json(&tally, sink.path())?);
    } else if !args.quiet {
        print_summary(&tally, sink.path())?;
    }

    Ok(())
}

/// Drains `rx` with up to `concurrency` producers writing into the same sink.
/// Stops at the first write that fails for good, or as soon as the token is
/// cancelled. The reader may still be blocked on its input at that point and
/// is not waited for.
pub async fn collect(
    sink: &ResultSink,
    mut rx: mpsc::Receiver<ReadEvent>,
    concurrency: usize,
    category_key: &str,
    cancel_token: &CancellationToken,
) -> Result<Tally> {
    let mut writes = futures::stream::poll_fn(move |cx| rx.poll_recv(cx))
        .map(|event| produce(sink, event, category_key))
        .buffer_unordered(concurrency.max(1));

    let mut tally = Tally::new();
    loop {
        let next = tokio::select! {
            biased;
            () = cancel_token.cancelled() => {
                warn!(written = tally.written(), "collection interrupted");
                bail!("collection interrupted after {} records", tally.written());
            }
            next = writes.next() => next,
        };
        let Some((part, outcome)) = next else {
            break;
        };

        // Rows committed before a failure still count
        tally.merge(part);
        outcome.with_context(|| {
            format!(
                "failed to write to {} ({} records written)",
                sink.path().display(),
                tally.written()
            )
        })?;
    }

    tally.mark_complete();
    Ok(tally)
}

/// One producer: writes a batch record by record and tallies what landed,
/// alongside the error that stopped it, if any.
async fn produce(
    sink: &ResultSink,
    event: ReadEvent,
    category_key: &str,
) -> (Tally, Result<(), SinkError>) {
    let mut part = Tally::default();

    match event {
        ReadEvent::Batch(batch) => {
            for record in &batch.records {
                if let Err(e) = sink.write(record).await {
                    return (part, Err(e));
                }
                part.record(&batch.source, category_of(record, category_key));
            }
        }
        ReadEvent::Malformed { source, error } => {
            warn!(source = %source, error = %error, "input skipped");
            part.malformed_inputs += 1;
        }
    }

    (part, Ok(()))
}
