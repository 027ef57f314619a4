//! Non-fatal findings collected while compiling or running templates

use std::collections::HashSet;
use std::fmt;

use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// A recoverable problem; the output is still produced
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// A variable marker had neither a supplied value nor a default
    MissingVariable { template: String, variable: String },
    /// `is="NAME"` names no registered template
    UnresolvedPolymorphicTemplate { template: String },
    /// A hyphenated tag that no template defines
    UnresolvedCustomElement { tag: String },
    /// A template ships a script but no behavior is registered for it
    MissingBehavior { template: String },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self {
            Diagnostic::UnresolvedPolymorphicTemplate { .. } => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingVariable { template, variable } => write!(
                f,
                "Template `{}` requires `data-var-{}` but it's missing",
                template, variable
            ),
            Diagnostic::UnresolvedPolymorphicTemplate { template } => {
                write!(f, "Template `{}` is not defined", template)
            }
            Diagnostic::UnresolvedCustomElement { tag } => {
                write!(f, "Custom element `<{}>` has no template", tag)
            }
            Diagnostic::MissingBehavior { template } => write!(
                f,
                "Template `{}` has a script but no behavior is registered",
                template
            ),
        }
    }
}

/// Session-scoped diagnostic sink.
///
/// Every finding is recorded; each distinct one is echoed to the log once.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    echoed: HashSet<Diagnostic>,
    silent: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records without echoing
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.silent && self.echoed.insert(diagnostic.clone()) {
            match diagnostic.severity() {
                Severity::Warning => logger::warn(&diagnostic.to_string()),
                Severity::Error => logger::error(&diagnostic.to_string()),
            }
        }
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.severity() == Severity::Error)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drain recorded entries; the echo history is kept
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}
