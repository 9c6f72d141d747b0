//! Error and diagnostic types for the model, parser, transformer and validator.

use thiserror::Error;

/// Severity of a single [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single, locatable validation finding.
///
/// `element_ref` is the qualified name of the offending element (e.g. `bpmn:startEvent`),
/// optionally paired with its id for disambiguation when several elements share a qname.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub element_ref: ElementRef,
    pub message: String,
}

impl Diagnostic {
    pub fn error(element_ref: ElementRef, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            element_ref,
            message: message.into(),
        }
    }

    pub fn warning(element_ref: ElementRef, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            element_ref,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.element_ref.line {
            Some(line) => write!(
                f,
                "[{}] [line:{}] ({}) {}",
                self.severity, line, self.element_ref.qname, self.message
            ),
            None => write!(
                f,
                "[{}] ({}) {}",
                self.severity, self.element_ref.qname, self.message
            ),
        }
    }
}

/// Identifies the element a diagnostic is about: a BPMN-qualified element name, the
/// element's own id (when it has one), and the source line (when the model was read
/// from XML and the line was recorded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementRef {
    pub qname: String,
    pub id: Option<String>,
    pub line: Option<u32>,
}

impl ElementRef {
    pub fn new(qname: impl Into<String>) -> Self {
        ElementRef {
            qname: qname.into(),
            id: None,
            line: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Malformed XML/YAML, I/O failure, or schema mismatch. Fatal: no partial model is
/// ever handed back alongside this error.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML at line {line}: {message}")]
    MalformedXml { line: u32, message: String },

    #[error("malformed YAML: {message}")]
    MalformedYaml { message: String },

    #[error("unsupported BPMN element '{qname}' at line {line}")]
    UnsupportedElement { qname: String, line: u32 },

    #[error("unknown attribute '{attribute}' on '{qname}' at line {line}")]
    UnknownAttribute {
        qname: String,
        attribute: String,
        line: u32,
    },

    #[error("required attribute '{attribute}' missing on '{qname}' at line {line}")]
    MissingAttribute {
        qname: String,
        attribute: String,
        line: u32,
    },

    #[error("I/O failure reading BPMN source: {0}")]
    Io(String),
}

/// Aggregation of one or more `ERROR`-severity diagnostics, raised by the reader and
/// builder entry points. `validate()` itself returns the diagnostic sequence directly
/// instead of raising this.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("BPMN model failed validation with {} error(s): {}", .diagnostics.iter().filter(|d| d.severity == Severity::Error).count(), first_error_text(.diagnostics))]
pub struct ValidationError {
    pub diagnostics: Vec<Diagnostic>,
}

fn first_error_text(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.severity == Severity::Error)
        .map(|d| d.to_string())
        .unwrap_or_default()
}

impl ValidationError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        ValidationError { diagnostics }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.diagnostics.iter().any(|d| d.message.contains(needle))
    }
}

/// Internal failure bubbled up by an external JSON-path or JSON-condition compiler.
/// Never thrown across a public API boundary: it is captured into the `compiled`
/// field of the owning mapping/condition and surfaced later as a validation
/// diagnostic, not propagated as a `Result::Err` to the caller of `transform`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct CompileError {
    pub reason: String,
}

impl CompileError {
    pub fn new(reason: impl Into<String>) -> Self {
        CompileError {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display_with_line() {
        let d = Diagnostic::error(
            ElementRef::new("bpmn:startEvent").with_line(12),
            "Activity id is required.",
        );
        assert_eq!(
            d.to_string(),
            "[ERROR] [line:12] (bpmn:startEvent) Activity id is required."
        );
    }

    #[test]
    fn diagnostic_display_without_line() {
        let d = Diagnostic::warning(
            ElementRef::new("bpmn:exclusiveGateway"),
            "An exclusive gateway should have a default sequence flow without condition.",
        );
        assert_eq!(
            d.to_string(),
            "[WARNING] (bpmn:exclusiveGateway) An exclusive gateway should have a default sequence flow without condition."
        );
    }

    #[test]
    fn validation_error_contains_matches_message_substring() {
        let err = ValidationError::new(vec![Diagnostic::error(
            ElementRef::new("bpmn:process"),
            "The process must contain at least one none start event.",
        )]);
        assert!(err.contains("must contain at least one none start event"));
        assert!(!err.contains("taskDefinition"));
    }
}
