use std::sync::Arc;

use thiserror::Error;

use crate::shape::Shape;
use crate::value::{Key, Value};

/// Failure while resolving one value against an expected shape.
///
/// Container variants nest the inner failure together with the index or key
/// where it happened, so a deep mismatch reports its full path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResolveError {
    #[error("expected {expected}, got {found}")]
    Mismatch {
        expected: String,
        found: &'static str,
    },

    #[error("expected a sequence of length {expected}, got length {found}")]
    Length { expected: usize, found: usize },

    #[error("value {value} does not fit into {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("index {index}: {source}")]
    Element {
        index: usize,
        source: Box<ResolveError>,
    },

    #[error("key {key}: {source}")]
    Entry { key: Key, source: Box<ResolveError> },

    #[error("pointee: {source}")]
    Pointee { source: Box<ResolveError> },

    #[error("upstream promise failed: {0}")]
    Upstream(#[from] PromiseError),
}

impl ResolveError {
    /// A mismatch between the shape a slot expects and the value found there.
    pub fn type_mismatch(expected: &Shape, found: &Value) -> Self {
        ResolveError::Mismatch {
            expected: expected.to_string(),
            found: found.kind(),
        }
    }

    pub(crate) fn at_index(self, index: usize) -> Self {
        ResolveError::Element {
            index,
            source: Box::new(self),
        }
    }

    pub(crate) fn at_key(self, key: Key) -> Self {
        ResolveError::Entry {
            key,
            source: Box::new(self),
        }
    }
}

/// Failure raised by [`run_async`](crate::run_async) and
/// [`run_sync`](crate::run_sync).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CallError {
    #[error("expected {expected} argument(s), got {got}")]
    ArgCount { expected: usize, got: usize },

    #[error("argument {index}: {source}")]
    Argument { index: usize, source: ResolveError },

    #[error("return value: {0}")]
    ReturnType(ResolveError),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

/// Why a blocked reader was released without a value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PromiseError {
    #[error("producing task failed: {0}")]
    TaskFailed(Arc<CallError>),
}
