// Meowkov Engine — Importer
//
// Bulk-learns a chat log piped on stdin, one message per line. Lines are
// learned concurrently with a bounded number in flight; the order in which
// they reach the corpus does not matter because learning only adds to sets.

use crate::atoms::constants::{IMPORT_LINES_PER_CPU, IMPORT_PROGRESS_EVERY};
use crate::atoms::error::{EngineError, EngineResult};
use crate::engine::responder::Responder;
use log::{error, info};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Import stdin. Refuses to read from an interactive terminal.
pub async fn import_stdin(responder: Arc<Responder>, purge: bool) -> EngineResult<usize> {
    if std::io::stdin().is_terminal() {
        return Err(EngineError::Other("no input: please pipe some data in and try again".into()));
    }
    let in_flight = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1) * IMPORT_LINES_PER_CPU;
    import(tokio::io::stdin(), responder, purge, in_flight).await
}

/// Learn every line of `input`, at most `in_flight` at a time. Returns the
/// number of lines read.
pub async fn import<R: AsyncRead + Unpin>(
    input: R,
    responder: Arc<Responder>,
    purge: bool,
    in_flight: usize,
) -> EngineResult<usize> {
    let corpus = responder.corpus();
    if purge {
        info!("[import] PURGE: removing old corpus");
        corpus.purge().await?;
    }
    info!("[import] Loading piped data into {} corpus", corpus.backend());

    let permits = Arc::new(Semaphore::new(in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut reader = BufReader::new(input);
    let mut buf = Vec::new();
    let mut count = 0usize;

    loop {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EngineError::Other(format!("Import semaphore closed: {}", e)))?;

        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string();
        count += 1;

        let responder = responder.clone();
        tasks.spawn(async move {
            responder.process_input(&line, true).await;
            drop(permit);
        });

        if count % IMPORT_PROGRESS_EVERY == 0 {
            info!("[import] {} lines read", count);
        }
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                error!("[import] Line task failed: {}", e);
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("[import] Line task failed: {}", e);
        }
    }

    info!("[import] IMPORT finished, processed {} lines", count);
    Ok(count)
}
