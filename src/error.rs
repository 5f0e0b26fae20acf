//! Error types, error codes, and security limits for ZON encoding/decoding.

use thiserror::Error;

/// Default anchor interval: every Kth row is emitted in full rather than
/// predicted, so a decoder can resynchronise after a torn/truncated stream.
pub const DEFAULT_ANCHOR_INTERVAL: u32 = 100;

/// Reject documents larger than this (E301).
pub const MAX_DOCUMENT_SIZE: usize = 100 * 1024 * 1024;
/// Reject any single line longer than this (E302).
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;
/// Reject arrays longer than this (E303).
pub const MAX_ARRAY_LENGTH: usize = 1_000_000;
/// Reject objects with more keys than this (E304).
pub const MAX_OBJECT_KEYS: usize = 100_000;
/// Reject nesting deeper than this.
pub const MAX_NESTING_DEPTH: usize = 100;

/// Errors raised while encoding a [`crate::Value`] into ZON text.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The value graph contains a cycle. Unreachable with the current
    /// (plain, owned) `Value` representation — there is no way to construct
    /// a cyclic `Value` in safe Rust without shared interior mutability — but
    /// kept as a variant for API parity with the documented
    /// error surface, and so a future `Value` representation that does admit
    /// sharing (e.g. `Rc`-based) can report it without a breaking change.
    #[error("circular reference detected while encoding")]
    CircularReference,

    /// A value could not be represented on the wire. No current `Value`
    /// variant produces this today (NaN/±∞ normalise to `null` instead of
    /// erroring, per the documented policy) — reserved for values a future
    /// `Value` variant might introduce.
    #[error("unsupported value: {0}")]
    UnsupportedType(String),
}

/// A decoding error, carrying the stable error code, a message, and as much
/// location context as was available when the error was raised.
#[derive(Error, Debug)]
#[error("{code}: {message}{}{}",
    .line.map(|l| format!(" (line {l})")).unwrap_or_default(),
    .context.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
pub struct DecodeError {
    pub code: ErrorCode,
    pub message: String,
    pub line: Option<usize>,
    pub context: Option<String>,
}

impl DecodeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        DecodeError {
            code,
            message: message.into(),
            line: None,
            context: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Stable, user-visible error codes. See §6/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Declared table row count != actual row count (strict mode only).
    E001,
    /// Row field count < schema column count (strict mode only).
    E002,
    /// Document size exceeds [`MAX_DOCUMENT_SIZE`].
    E301,
    /// Line length exceeds [`MAX_LINE_LENGTH`].
    E302,
    /// Array length exceeds [`MAX_ARRAY_LENGTH`].
    E303,
    /// Object key count exceeds [`MAX_OBJECT_KEYS`].
    E304,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCode::E001 => "E001",
            ErrorCode::E002 => "E002",
            ErrorCode::E301 => "E301",
            ErrorCode::E302 => "E302",
            ErrorCode::E303 => "E303",
            ErrorCode::E304 => "E304",
        };
        f.write_str(s)
    }
}

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
