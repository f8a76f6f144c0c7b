//! Errors as values.
//!
//! `FlowError` is for failures that are data: preset validation problems,
//! adapter diagnostics, anything that gets collected, compared and reported.
//! Contract violations are `crate::error::BatchFlowError` instead.
//!
//! Every type here is totally ordered so that aggregated reports come out in
//! the same order on every run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable numeric error codes, grouped by thousands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u32)]
pub enum ErrorCode {
    Success = 0,

    UnknownError = 1000,
    InvalidInput = 1001,
    InvalidState = 1002,
    InvalidOperation = 1003,

    ResourceNotFound = 2000,
    ResourceUnavailable = 2001,
    ResourceExhausted = 2002,
    ResourceCorrupted = 2003,

    ProcessingFailed = 3000,
    ProcessingTimeout = 3001,
    ProcessingCancelled = 3002,
    ProcessingIncomplete = 3003,

    ValidationFailed = 4000,
    ValidationIncomplete = 4001,
    ValidationTimeout = 4002,

    SystemError = 5000,
    SystemUnavailable = 5001,
    SystemOverloaded = 5002,
}

impl ErrorCode {
    const ALL: [ErrorCode; 19] = [
        ErrorCode::Success,
        ErrorCode::UnknownError,
        ErrorCode::InvalidInput,
        ErrorCode::InvalidState,
        ErrorCode::InvalidOperation,
        ErrorCode::ResourceNotFound,
        ErrorCode::ResourceUnavailable,
        ErrorCode::ResourceExhausted,
        ErrorCode::ResourceCorrupted,
        ErrorCode::ProcessingFailed,
        ErrorCode::ProcessingTimeout,
        ErrorCode::ProcessingCancelled,
        ErrorCode::ProcessingIncomplete,
        ErrorCode::ValidationFailed,
        ErrorCode::ValidationIncomplete,
        ErrorCode::ValidationTimeout,
        ErrorCode::SystemError,
        ErrorCode::SystemUnavailable,
        ErrorCode::SystemOverloaded,
    ];

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.as_u32()
    }
}

impl TryFrom<u32> for ErrorCode {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_u32() == value)
            .ok_or_else(|| format!("unknown error code {value}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorSeverity::Info => "Info",
            ErrorSeverity::Warning => "Warning",
            ErrorSeverity::Error => "Error",
            ErrorSeverity::Fatal => "Fatal",
        };
        f.write_str(s)
    }
}

/// Where an error happened. Parameters are kept sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            location: location.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operation.is_empty() && self.location.is_empty() && self.parameters.is_empty()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorContext{{operation=\"{}\", location=\"{}\"",
            self.operation, self.location
        )?;
        if !self.parameters.is_empty() {
            f.write_str(", parameters={")?;
            for (i, (key, value)) in self.parameters.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{key}=\"{value}\"")?;
            }
            f.write_str("}")?;
        }
        f.write_str("}")
    }
}

/// A failure value. Ordered by code, then severity, then message, then
/// context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowError {
    pub code: ErrorCode,
    pub severity: ErrorSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "ErrorContext::is_empty")]
    pub context: ErrorContext,
}

impl FlowError {
    pub fn new(code: ErrorCode, severity: ErrorSeverity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error{{code={}, severity={}, message=\"{}\"",
            self.code.as_u32(),
            self.severity,
            self.message
        )?;
        if !self.context.is_empty() {
            write!(f, ", context={}", self.context)?;
        }
        f.write_str("}")
    }
}

impl std::error::Error for FlowError {}

pub type FlowResult<T> = Result<T, FlowError>;

/// A sorted collection of `FlowError`s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorList {
    errors: Vec<FlowError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(error: FlowError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    pub fn push(&mut self, error: FlowError) {
        let at = self.errors.partition_point(|e| e <= &error);
        self.errors.insert(at, error);
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
        self.errors.sort();
    }

    pub fn errors(&self) -> &[FlowError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Any error at or above `min`?
    pub fn has_severity(&self, min: ErrorSeverity) -> bool {
        self.errors.iter().any(|e| e.severity >= min)
    }

    /// `Ok(())` when empty, otherwise the list itself.
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl FromIterator<FlowError> for ErrorList {
    fn from_iter<I: IntoIterator<Item = FlowError>>(iter: I) -> Self {
        let mut errors: Vec<FlowError> = iter.into_iter().collect();
        errors.sort();
        Self { errors }
    }
}

impl IntoIterator for ErrorList {
    type Item = FlowError;
    type IntoIter = std::vec::IntoIter<FlowError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("ErrorList{empty}");
        }
        write!(f, "ErrorList{{count={}, errors=[", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{error}")?;
        }
        f.write_str("]}")
    }
}

impl std::error::Error for ErrorList {}
