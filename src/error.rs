//! Error taxonomy shared by the stream layer, the pipeline and the command
//! language front end.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::token::{Span, Token};

/// Top-level error type. Transforms never catch or reinterpret these; they
/// travel unchanged up to whoever drives the pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening, seeking or reading an input file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing to the output sink failed.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),

    /// The WAV file is well-formed but not mono 16-bit PCM at the fixed rate.
    #[error("unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    /// Truncated header, truncated chunk or odd data size.
    #[error("malformed WAV file: {0}")]
    MalformedWav(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configuration error raised while executing a parsed script step.
    #[error("line {line}, column {column}: {source}")]
    Script {
        line: usize,
        column: usize,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unreadable settings: {0}")]
    Settings(#[from] serde_json::Error),
}

/// User-input errors: bad slot references and invalid settings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("slot ids start from 1")]
    SlotZero,

    #[error("slot {slot} does not exist ({len} tracks loaded)")]
    SlotOutOfRange { slot: usize, len: usize },

    #[error("slot {0} is empty")]
    SlotEmpty(usize),

    #[error("resample factor must be greater than 0%")]
    ZeroFactor,

    #[error("no input tracks were given")]
    NoTracks,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {}, column {}", .span.line, .span.column)]
    UnexpectedChar { ch: char, span: Span },

    #[error("invalid number '{text}' at line {}, column {}", .span.line, .span.column)]
    InvalidNumber { text: String, span: Span },

    #[error("expected slot id (like $2) at line {}, column {}", .span.line, .span.column)]
    InvalidSlot { span: Span },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found {found:?} at line {}, column {}", .span.line, .span.column)]
    UnexpectedToken {
        expected: String,
        found: Token,
        span: Span,
    },

    #[error("unknown command \"{name}\" at line {}, column {}", .span.line, .span.column)]
    UnknownCommand { name: String, span: Span },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        assert_eq!(ConfigError::SlotEmpty(3).to_string(), "slot 3 is empty");
        assert_eq!(ConfigError::SlotZero.to_string(), "slot ids start from 1");
        assert_eq!(
            ConfigError::SlotOutOfRange { slot: 4, len: 2 }.to_string(),
            "slot 4 does not exist (2 tracks loaded)"
        );
    }

    #[test]
    fn script_error_carries_position() {
        let err = Error::Script {
            line: 2,
            column: 9,
            source: ConfigError::SlotEmpty(2),
        };
        assert_eq!(err.to_string(), "line 2, column 9: slot 2 is empty");
    }

    #[test]
    fn io_error_mentions_path() {
        let err = Error::Io {
            path: PathBuf::from("missing.wav"),
            source: io::Error::new(io::ErrorKind::NotFound, "file missing"),
        };
        let text = err.to_string();
        assert!(text.contains("missing.wav"), "{text}");
        assert!(text.contains("file missing"), "{text}");
    }

    #[test]
    fn config_error_converts() {
        let err: Error = ConfigError::NoTracks.into();
        assert!(matches!(err, Error::Config(ConfigError::NoTracks)));
    }
}
