//! Stable error codes for effect start-up and caller mistakes.
//!
//! Init failures (`SURFACE_NOT_FOUND`, `SURFACE_CREATION_FAILED`,
//! `ALREADY_INITIALIZED`) and usage errors (`INVALID_THEME`, `INVALID_STYLE`,
//! `INVALID_VIEWPORT`) travel inside `anyhow` chains as a [`CodedError`].
//! [`find_coded_error`] recovers them. The CLI prints
//! [`ErrorEnvelope::for_error`] under `--json` and exits with [`exit_status`].

use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    /// The effect could not start; the host page keeps working without it.
    Init,
    Usage,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn init(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Init,
        }
    }

    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Usage,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Code used in `--json` output for failures that carry no [`CodedError`].
pub const RUNTIME_ERROR: &str = "RUNTIME_ERROR";

impl ErrorEnvelope {
    /// The envelope of the first coded error in the chain, or a
    /// `RUNTIME_ERROR` carrying the whole chain as its message.
    pub fn for_error(error: &Error) -> Self {
        match find_coded_error(error) {
            Some(coded) => coded.envelope(),
            None => Self {
                ok: false,
                error: ErrorEnvelopeBody {
                    code: RUNTIME_ERROR.to_owned(),
                    message: format!("{error:#}"),
                    details: None,
                },
            },
        }
    }
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// CLI exit status: 2 for usage errors, 1 for everything else.
pub fn exit_status(error: &Error) -> u8 {
    match find_coded_error(error).map(|coded| coded.kind) {
        Some(CodedErrorKind::Usage) => 2,
        Some(CodedErrorKind::Init) | None => 1,
    }
}
