use orion_error::prelude::*;

use crate::error::{TailReason, TailResult};

/// Upper edge of the initial query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEnd {
    /// Exclusive epoch-millisecond bound.
    Bounded(i64),
    /// Keep advancing to "now".
    Unbounded,
}

/// Caller-supplied description of one tailing session. Immutable once the
/// session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailRequest {
    pub source: String,
    pub stream_hint: Option<String>,
    /// Inclusive epoch-millisecond lower bound of the first window.
    pub window_start: i64,
    pub window_end: WindowEnd,
    pub follow: bool,
    pub include: Option<String>,
    pub exclude: Option<String>,
}

impl TailRequest {
    pub fn new(source: impl Into<String>, window_start: i64) -> Self {
        Self {
            source: source.into(),
            stream_hint: None,
            window_start,
            window_end: WindowEnd::Unbounded,
            follow: false,
            include: None,
            exclude: None,
        }
    }

    pub fn with_stream_hint(mut self, hint: impl Into<String>) -> Self {
        self.stream_hint = Some(hint.into());
        self
    }

    pub fn with_end(mut self, end: i64) -> Self {
        self.window_end = WindowEnd::Bounded(end);
        self
    }

    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn with_include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    pub fn with_exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Shape checks that do not involve pattern compilation.
    pub fn validate(&self) -> TailResult<()> {
        if self.source.trim().is_empty() {
            return Err(StructError::from(TailReason::Validation)
                .with_detail("source must not be empty"));
        }
        if let WindowEnd::Bounded(end) = self.window_end
            && self.window_start > end
        {
            return Err(StructError::from(TailReason::Validation).with_detail(format!(
                "window start {} is after window end {end}",
                self.window_start
            )));
        }
        Ok(())
    }
}
