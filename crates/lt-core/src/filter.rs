use orion_error::prelude::*;
use regex::Regex;

use crate::error::{TailReason, TailResult};

/// Include/exclude predicate over a record body.
///
/// Patterns are regular expressions compiled once at session start; an
/// empty pattern is treated as absent.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    include: Option<Regex>,
    exclude: Option<Regex>,
}

impl MatchFilter {
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> TailResult<Self> {
        Ok(Self {
            include: compile("include", include)?,
            exclude: compile("exclude", exclude)?,
        })
    }

    pub fn matches(&self, body: &str) -> bool {
        matches(body, self.include.as_ref(), self.exclude.as_ref())
    }

    pub fn is_pass_through(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// The include pattern, if it is a plain literal that a remote service
    /// can apply as a substring filter.
    pub fn pushdown_literal(&self) -> Option<&str> {
        let pattern = self.include.as_ref()?.as_str();
        (!pattern.contains(META)).then_some(pattern)
    }
}

/// Characters with meaning outside a character class.
const META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Both constraints must hold; an absent pattern imposes none.
pub fn matches(body: &str, include: Option<&Regex>, exclude: Option<&Regex>) -> bool {
    if let Some(inc) = include
        && !inc.is_match(body)
    {
        return false;
    }
    if let Some(exc) = exclude
        && exc.is_match(body)
    {
        return false;
    }
    true
}

fn compile(role: &str, pattern: Option<&str>) -> TailResult<Option<Regex>> {
    match pattern {
        None | Some("") => Ok(None),
        Some(p) => Regex::new(p).map(Some).map_err(|e| {
            StructError::from(TailReason::Validation)
                .with_detail(format!("invalid {role} pattern {p:?}: {e}"))
        }),
    }
}
