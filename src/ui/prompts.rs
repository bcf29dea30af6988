//! ui::prompts
//!
//! Interactive prompts for values the command line and config file left out.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode and only when stdin is a
//! terminal. In non-interactive mode a missing required value fails with a
//! clear error instead of blocking on input that will never come.

use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Whether stdin is attached to a terminal.
pub fn stdin_is_terminal() -> bool {
    io::stdin().is_terminal()
}

/// Prompt for text input on stdin/stderr.
///
/// An empty answer takes `default` when there is one and asks again
/// otherwise. End of input cancels.
pub fn input(message: &str, default: Option<&str>, interactive: bool) -> Result<String, PromptError> {
    if !interactive || !stdin_is_terminal() {
        return Err(PromptError::NotInteractive);
    }
    let stdin = io::stdin();
    input_from(&mut stdin.lock(), &mut io::stderr(), message, default)
}

/// [`input`] over arbitrary streams.
pub fn input_from<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    message: &str,
    default: Option<&str>,
) -> Result<String, PromptError> {
    let io_err = |e: io::Error| PromptError::IoError(e.to_string());
    loop {
        match default {
            Some(d) => write!(writer, "{message} [{d}]: ").map_err(io_err)?,
            None => write!(writer, "{message}: ").map_err(io_err)?,
        }
        writer.flush().map_err(io_err)?;

        let mut line = String::new();
        if reader.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(PromptError::Cancelled);
        }
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        if let Some(d) = default {
            return Ok(d.to_string());
        }
    }
}
