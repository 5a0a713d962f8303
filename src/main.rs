/*!
 * Sync Pipe - Demo Entry Point
 *
 * Pumps stdin to stdout through one session of the channel: a writer
 * thread feeds the pipe while the main thread reads it back out.
 *
 * Environment variables:
 * - SYNCPIPE_CAPACITY: session buffer size in bytes (default 8192)
 * - SYNCPIPE_PAIRING: `any` or `match`
 * - SYNCPIPE_MEMORY_BUDGET: total buffer bytes allowed
 * - RUST_LOG / SYNCPIPE_TRACE_JSON: tracing output
 */

use miette::{miette, IntoDiagnostic};
use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

use syncpipe::{init_tracing, span_operation, PipeConfig, PipeFile, Role, SessionCoordinator};

/// Pause between retries while the buffer is full
const FULL_BACKOFF: Duration = Duration::from_millis(1);

fn main() -> miette::Result<()> {
    init_tracing();

    let config = PipeConfig::from_env()?;
    info!(
        capacity = config.capacity,
        pairing = ?config.pairing,
        memory_budget = ?config.memory_budget,
        "sync pipe starting"
    );
    let coordinator = SessionCoordinator::new(config)?;

    // Reader opens first and creates the session the writer will join
    let mut reader = PipeFile::open(&coordinator, Role::Reader)?;

    let writer_coordinator = coordinator.clone();
    let producer = thread::Builder::new()
        .name("pipe-writer".to_string())
        .spawn(move || -> io::Result<u64> {
            let mut writer = PipeFile::open(&writer_coordinator, Role::Writer)?;
            let span = span_operation("pump_stdin");
            let total = pump(io::stdin().lock(), &mut writer)?;
            span.record_bytes(total);
            writer.close()?;
            Ok(total)
        })
        .into_diagnostic()?;

    let span = span_operation("drain_to_stdout");
    let mut stdout = io::stdout().lock();
    let delivered = io::copy(&mut reader, &mut stdout).into_diagnostic()?;
    stdout.flush().into_diagnostic()?;
    span.record_bytes(delivered);
    drop(span);

    let written = producer
        .join()
        .map_err(|_| miette!("pipe writer thread panicked"))?
        .into_diagnostic()?;

    if written != delivered {
        warn!(written, delivered, "byte counts differ");
    }

    let stats = coordinator.coordinator_stats();
    match serde_json::to_string(&stats) {
        Ok(json) => info!(stats = %json, written, delivered, "sync pipe finished"),
        Err(e) => warn!(error = %e, "failed to serialize coordinator stats"),
    }

    reader.close()?;
    coordinator.shutdown();
    Ok(())
}

/// Copy `input` into the pipe, retrying while the buffer is full
fn pump(mut input: impl Read, writer: &mut PipeFile) -> io::Result<u64> {
    let mut chunk = [0u8; 4096];
    let mut total = 0u64;

    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut offset = 0;
        while offset < n {
            match writer.write(&chunk[offset..n]) {
                Ok(written) => offset += written,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(FULL_BACKOFF),
                Err(e) => return Err(e),
            }
        }
        total += n as u64;
    }
}
