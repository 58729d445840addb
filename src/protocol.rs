//! UTI text protocol parser and response generator.
//!
//! Implements the subset of the Ultimate Tic-Tac-Toe Interface spoken by
//! the stub:
//! - Handshake: `uti` / `utiok`
//! - Position: `pos moves <last_move>`
//! - Search: `search free`
//! - Reply: `info best_move=<move>`

use bytes::BytesMut;
use std::num::IntErrorKind;

/// Parsed UTI command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Handshake opening a session
    Uti,

    /// Position update carrying the opponent's last move
    Position { last_move: i64 },

    /// Search with no time control
    SearchFree,
}

/// Protocol parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Line was blank after trimming
    Empty,
    /// First token is not a known command
    UnknownCommand(String),
    /// A required token is missing
    MissingToken(&'static str),
    /// A token is present but not the expected literal
    UnexpectedToken { expected: &'static str, got: String },
    /// Move index is not a signed integer
    InvalidNumber(String),
    /// `search` line other than exactly `search free`
    InvalidSearch(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Empty => write!(f, "Empty command"),
            ParseError::UnknownCommand(cmd) => write!(f, "Unknown command: {}", cmd),
            ParseError::MissingToken(what) => write!(f, "Missing token: {}", what),
            ParseError::UnexpectedToken { expected, got } => {
                write!(f, "Expected '{}', got '{}'", expected, got)
            }
            ParseError::InvalidNumber(tok) => write!(f, "Invalid number: {}", tok),
            ParseError::InvalidSearch(line) => write!(f, "Unsupported search: {}", line),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parser for UTI command lines
pub struct Parser;

impl Parser {
    /// Parse a single command line. Surrounding whitespace is ignored,
    /// everything else is matched case-sensitively.
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let line = line.trim();

        if line == "uti" {
            return Ok(Command::Uti);
        }
        if line == "search free" {
            return Ok(Command::SearchFree);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.first() {
            None => Err(ParseError::Empty),
            Some(&"pos") => Self::parse_position(&parts),
            Some(&"search") => Err(ParseError::InvalidSearch(line.to_string())),
            Some(other) => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }

    /// Parse: pos moves <last_move> [ignored...]
    fn parse_position(parts: &[&str]) -> Result<Command, ParseError> {
        match parts.get(1) {
            Some(&"moves") => {}
            Some(other) => {
                return Err(ParseError::UnexpectedToken {
                    expected: "moves",
                    got: other.to_string(),
                })
            }
            None => return Err(ParseError::MissingToken("moves")),
        }

        let token = parts.get(2).ok_or(ParseError::MissingToken("last move"))?;
        let last_move =
            parse_move(token).ok_or_else(|| ParseError::InvalidNumber(token.to_string()))?;

        Ok(Command::Position { last_move })
    }
}

/// Parse a move index.
///
/// Accepts an optional sign, then digits with single `_` separators between
/// them (`1_0` is 10). Integers beyond the i64 range saturate, which keeps
/// them off the reply table.
fn parse_move(token: &str) -> Option<i64> {
    let (sign, digits) = match token.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", token.strip_prefix('+').unwrap_or(token)),
    };

    let well_formed = !digits.is_empty()
        && !digits.starts_with('_')
        && !digits.ends_with('_')
        && !digits.contains("__")
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'_');
    if !well_formed {
        return None;
    }

    let cleaned: String = sign
        .chars()
        .chain(digits.chars().filter(|&c| c != '_'))
        .collect();
    match cleaned.parse::<i64>() {
        Ok(n) => Some(n),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Response lines sent to the peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Handshake acknowledgement
    UtiOk,
    /// Search result
    Info { best_move: i64 },
}

impl Response {
    /// Encode as a newline-terminated line
    pub fn encode(&self) -> BytesMut {
        let line = format!("{}\n", self);
        let mut buf = BytesMut::with_capacity(line.len());
        buf.extend_from_slice(line.as_bytes());
        buf
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::UtiOk => write!(f, "utiok"),
            Response::Info { best_move } => write!(f, "info best_move={}", best_move),
        }
    }
}
