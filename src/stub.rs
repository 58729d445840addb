//! Canned-reply UTI session.
//!
//! Drives one request/response cycle per turn:
//!
//! ```text
//! <- uti
//! -> utiok
//! <- pos moves <x>
//! <- search free
//!    (think)
//! -> info best_move=<best_move(x)>
//! <- <one line, discarded>
//! ```
//!
//! The reply never depends on a real board, so the stub is only useful for
//! checking that a harness speaks the protocol.

use crate::config::{Config, EofPolicy};
use crate::input::LineReader;
use crate::protocol::{Command, ParseError, Parser, Response};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, trace};

/// Which line the session expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitHandshake,
    AwaitPosition,
    AwaitSearch,
    AwaitTrailer,
}

impl Phase {
    /// Whether running out of input here falls between two turns
    fn is_turn_boundary(self) -> bool {
        matches!(self, Phase::AwaitPosition | Phase::AwaitTrailer)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::AwaitHandshake => write!(f, "handshake 'uti'"),
            Phase::AwaitPosition => write!(f, "'pos moves <n>'"),
            Phase::AwaitSearch => write!(f, "'search free'"),
            Phase::AwaitTrailer => write!(f, "line after reply"),
        }
    }
}

/// Reply for the opponent's last move. A short fixed line of play from the
/// empty board; anything off that line gets 18.
pub fn best_move(last_move: i64) -> i64 {
    match last_move {
        -1 => 0,
        0 => 1,
        1 => 9,
        9 => 2,
        _ => 18,
    }
}

/// Fatal session errors
#[derive(Debug)]
pub enum StubError {
    /// First line was not `uti`
    Handshake { got: String },
    /// Input ended while a line was expected
    EndOfInput { phase: Phase },
    /// Position line was not `pos moves <integer>`
    MalformedPosition { line: String, source: ParseError },
    /// Search line was not exactly `search free`
    MalformedSearch { line: String },
    /// Reading or writing a stream failed
    Io(std::io::Error),
}

impl std::fmt::Display for StubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StubError::Handshake { got } => {
                write!(f, "Handshake failed: expected 'uti', got '{}'", got)
            }
            StubError::EndOfInput { phase } => {
                write!(f, "Unexpected end of input while awaiting {}", phase)
            }
            StubError::MalformedPosition { line, source } => {
                write!(f, "Malformed position command '{}': {}", line, source)
            }
            StubError::MalformedSearch { line } => {
                write!(f, "Malformed search command: expected 'search free', got '{}'", line)
            }
            StubError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StubError::MalformedPosition { source, .. } => Some(source),
            StubError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StubError {
    fn from(e: std::io::Error) -> Self {
        StubError::Io(e)
    }
}

/// Outcome of a session that ended cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Number of `info` lines sent
    pub responses: u64,
}

/// Canned-reply engine
#[derive(Debug, Clone)]
pub struct Stub {
    think_time: Duration,
    eof: EofPolicy,
    diagnostics: bool,
}

impl Stub {
    /// Create a stub from resolved configuration
    pub fn new(config: &Config) -> Self {
        Self {
            think_time: config.think_time,
            eof: config.eof,
            diagnostics: config.diagnostics,
        }
    }

    /// Run a session until input ends or a line breaks the protocol.
    ///
    /// `out` receives protocol responses and `diag` receives one
    /// `client: SENT ...` line per reply. Both are flushed after each write.
    pub async fn run<W, D>(
        &self,
        lines: &mut LineReader,
        out: &mut W,
        diag: &mut D,
    ) -> Result<Summary, StubError>
    where
        W: AsyncWrite + Unpin,
        D: AsyncWrite + Unpin,
    {
        let mut phase = Phase::AwaitHandshake;
        let mut summary = Summary { responses: 0 };
        let mut last_move = 0;
        let mut last_reply = 0;

        loop {
            let line = match lines.next_line().await? {
                Some(line) => line,
                None => return self.end_of_input(phase, summary),
            };
            trace!(%phase, line = %line, "Received line");

            phase = match phase {
                Phase::AwaitHandshake => {
                    if !matches!(Parser::parse(&line), Ok(Command::Uti)) {
                        return Err(StubError::Handshake { got: line });
                    }
                    send(out, Response::UtiOk).await?;
                    debug!("Handshake complete");
                    Phase::AwaitPosition
                }

                Phase::AwaitPosition => match Parser::parse(&line) {
                    Ok(Command::Position { last_move: x }) => {
                        last_move = x;
                        Phase::AwaitSearch
                    }
                    Ok(_) => {
                        let got = line.split_whitespace().next().unwrap_or_default();
                        return Err(StubError::MalformedPosition {
                            source: ParseError::UnexpectedToken {
                                expected: "pos",
                                got: got.to_string(),
                            },
                            line,
                        });
                    }
                    Err(source) => return Err(StubError::MalformedPosition { line, source }),
                },

                Phase::AwaitSearch => {
                    if !matches!(Parser::parse(&line), Ok(Command::SearchFree)) {
                        return Err(StubError::MalformedSearch { line });
                    }

                    if !self.think_time.is_zero() {
                        trace!(think_time = ?self.think_time, "Thinking");
                        tokio::time::sleep(self.think_time).await;
                    }

                    last_reply = best_move(last_move);
                    let response = Response::Info {
                        best_move: last_reply,
                    };
                    if self.diagnostics {
                        diag.write_all(format!("client: SENT {}\n", response).as_bytes())
                            .await?;
                        diag.flush().await?;
                    }
                    send(out, response).await?;
                    summary.responses += 1;
                    debug!(last_move, best_move = last_reply, "Sent reply");
                    Phase::AwaitTrailer
                }

                Phase::AwaitTrailer => {
                    // Referees echo our move back here; the line is not checked.
                    match Parser::parse(&line) {
                        Ok(Command::Position { last_move: echoed }) => {
                            debug!(echoed, same_move = echoed == last_reply, "Discarded echo line");
                        }
                        _ => debug!(line = %line, "Discarded line"),
                    }
                    Phase::AwaitPosition
                }
            };
        }
    }

    fn end_of_input(&self, phase: Phase, summary: Summary) -> Result<Summary, StubError> {
        if self.eof == EofPolicy::Shutdown && phase.is_turn_boundary() {
            info!(responses = summary.responses, "Input exhausted, shutting down");
            return Ok(summary);
        }
        Err(StubError::EndOfInput { phase })
    }
}

/// Write one response line and flush it to the peer
async fn send<W>(out: &mut W, response: Response) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(&response.encode()).await?;
    out.flush().await
}
