use thiserror::Error;

/// Line-integrity failures. The whole line is dropped and the sender is
/// expected to resend it, so these never produce records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("line N{line} has no checksum")]
    MissingChecksum { line: u32 },

    #[error("checksum mismatch on line N{line}: sent {sent}, computed {computed}")]
    ChecksumMismatch { line: u32, sent: String, computed: u8 },

    #[error("line number N{line} received before any M110 reset")]
    LineNumberUnset { line: u32 },

    #[error("line number mismatch: expected N{expected}, got N{line}")]
    LineNumberMismatch { expected: u32, line: u32 },

    #[error("line number N{last} is the largest possible, send M110 to restart")]
    LineNumberExhausted { last: u32 },

    #[error("line number {0:?} is out of range")]
    BadLineNumber(String),
}

/// Tokenizer failures. These are reported to the caller as a trailing error
/// record whose message is the `Display` form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("unexpected character {0:?} where a word letter was expected")]
    UnexpectedCharacter(char),

    #[error("unexpected number {0:?} where a word letter was expected")]
    UnexpectedNumber(String),

    #[error("word {0} has no value")]
    MissingValue(char),

    #[error("negative command code {letter}{literal}")]
    NegativeCode { letter: char, literal: String },

    #[error("command code {letter}{literal} is out of range")]
    CodeOutOfRange { letter: char, literal: String },

    #[error("parameter {0} given without a command and no modal command is active")]
    NoModalCommand(char),
}
