//! uti-stub: a canned-reply UTI engine
//!
//! Speaks just enough of the Ultimate Tic-Tac-Toe Interface to exercise a
//! referee or harness:
//! - Handshake: `uti` answered with `utiok`
//! - Turns: `pos moves <n>` + `search free` answered with `info best_move=<m>`
//! - Replies come from a fixed table, after a configurable think delay
//!
//! Any protocol violation ends the process with a non-zero status.

mod config;
mod input;
mod protocol;
mod stub;

use config::Config;
use input::LineReader;
use stub::Stub;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout belongs to the protocol
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        inputs = config.inputs.len(),
        think_time_ms = config.think_time.as_millis() as u64,
        eof = ?config.eof,
        diagnostics = config.diagnostics,
        "Starting uti-stub"
    );

    let mut lines = LineReader::open(&config.inputs).await?;
    let stub = Stub::new(&config);

    let mut stdout = tokio::io::stdout();
    let mut stderr = tokio::io::stderr();
    let summary = stub.run(&mut lines, &mut stdout, &mut stderr).await?;

    info!(responses = summary.responses, "Session finished");
    Ok(())
}
