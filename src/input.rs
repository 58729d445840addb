//! Line input over one or more sources.
//!
//! Sources are drained in order, so `uti-stub a.txt - b.txt` reads the
//! lines of `a.txt`, then stdin, then `b.txt`. The reader is finite and
//! cannot be rewound.

use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, trace};

/// Boxed buffered input source
pub type Source = Box<dyn AsyncBufRead + Unpin + Send>;

/// Pull-based line reader
pub struct LineReader {
    sources: VecDeque<Source>,
    line: String,
}

impl LineReader {
    /// Create a reader draining `sources` in order
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources: sources.into(),
            line: String::with_capacity(64),
        }
    }

    /// Create a reader over a single source
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self::new(vec![Box::new(reader)])
    }

    /// Open the given inputs. An empty list or `-` means stdin.
    pub async fn open(paths: &[PathBuf]) -> Result<Self, InputError> {
        if paths.is_empty() {
            return Ok(Self::from_reader(BufReader::new(tokio::io::stdin())));
        }

        let mut sources: Vec<Source> = Vec::with_capacity(paths.len());
        for path in paths {
            if path.as_os_str() == "-" {
                sources.push(Box::new(BufReader::new(tokio::io::stdin())));
            } else {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| InputError::Open(path.clone(), e))?;
                debug!(path = %path.display(), "Opened input file");
                sources.push(Box::new(BufReader::new(file)));
            }
        }

        Ok(Self::new(sources))
    }

    /// Read the next line without its terminator.
    ///
    /// Returns `Ok(None)` once every source is exhausted.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        while let Some(source) = self.sources.front_mut() {
            self.line.clear();
            let n = source.read_line(&mut self.line).await?;
            if n == 0 {
                trace!("Input source exhausted");
                self.sources.pop_front();
                continue;
            }

            let line = strip_line_ending(&self.line);
            return Ok(Some(line.to_string()));
        }

        Ok(None)
    }
}

/// Strip a trailing `\n` or `\r\n`
fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Input opening errors
#[derive(Debug)]
pub enum InputError {
    Open(PathBuf, std::io::Error),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Open(path, e) => {
                write!(f, "Failed to open input '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for InputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InputError::Open(_, e) => Some(e),
        }
    }
}
