//! The two external expression engines the Transformer calls out to: a JSON-path
//! compiler (for input/output mappings) and a JSON condition compiler (for sequence
//! flow conditions). Both are abstracted behind narrow traits so callers can supply
//! their own implementation or a test double; a default implementation of each ships
//! so the crate is usable standalone.

use crate::error::CompileError;
use crate::ids::IdBytes;

/// Result of compiling a JSON-path expression. Carries just enough to let the
/// Validator report "this path was valid" or "this path was invalid, because X" —
/// the core never evaluates a compiled query, it only stores and validates it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledJsonPathQuery {
    Valid { source: IdBytes },
    Invalid { source: IdBytes, reason: String },
}

impl CompiledJsonPathQuery {
    pub fn is_valid(&self) -> bool {
        matches!(self, CompiledJsonPathQuery::Valid { .. })
    }

    pub fn source(&self) -> &IdBytes {
        match self {
            CompiledJsonPathQuery::Valid { source } => source,
            CompiledJsonPathQuery::Invalid { source, .. } => source,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            CompiledJsonPathQuery::Valid { .. } => None,
            CompiledJsonPathQuery::Invalid { reason, .. } => Some(reason),
        }
    }
}

/// `JsonPathCompiler::compile(bytes) -> Result<Query, CompileError>`.
///
/// Implementations MAY cache internal state but must not assume a shared instance is
/// safe to call concurrently from multiple threads (see the crate's concurrency
/// notes); the Transformer uses a fresh logical call per mapping.
pub trait JsonPathCompiler {
    fn compile(&self, text: &[u8]) -> Result<CompiledJsonPathQuery, CompileError>;
}

/// Default `JsonPathCompiler` backed by `jsonpath_lib`'s own compiler. It discards the
/// compiled selector immediately after validating the syntax — this crate never
/// evaluates a JSON-path query at runtime, only validates and stores it.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonPathLibCompiler;

impl JsonPathCompiler for JsonPathLibCompiler {
    fn compile(&self, text: &[u8]) -> Result<CompiledJsonPathQuery, CompileError> {
        let source = IdBytes::new(text.to_vec());
        let text_str = match std::str::from_utf8(text) {
            Ok(s) => s,
            Err(_) => {
                return Ok(CompiledJsonPathQuery::Invalid {
                    source,
                    reason: "JSON path must be valid UTF-8".to_string(),
                })
            }
        };
        let mut selector = jsonpath_lib::Selector::new();
        match selector.str_path(text_str) {
            Ok(_) => Ok(CompiledJsonPathQuery::Valid { source }),
            Err(reason) => Ok(CompiledJsonPathQuery::Invalid {
                source,
                reason: reason.to_string(),
            }),
        }
    }
}

/// Result of compiling a condition expression. Compilation never throws; an invalid
/// expression is represented, not raised, and surfaced later by the Validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompiledCondition {
    Valid {
        text: IdBytes,
    },
    Invalid {
        text: IdBytes,
        reason: String,
    },
}

impl CompiledCondition {
    pub fn is_valid(&self) -> bool {
        matches!(self, CompiledCondition::Valid { .. })
    }

    pub fn text(&self) -> &IdBytes {
        match self {
            CompiledCondition::Valid { text } => text,
            CompiledCondition::Invalid { text, .. } => text,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            CompiledCondition::Valid { .. } => None,
            CompiledCondition::Invalid { reason, .. } => Some(reason),
        }
    }
}

/// `JsonConditionCompiler::compile(bytes) -> CompiledCondition`. Never fails: an
/// unparsable expression becomes `CompiledCondition::Invalid`, not an `Err`.
pub trait JsonConditionCompiler {
    fn compile(&self, text: &[u8]) -> CompiledCondition;
}

/// Default `JsonConditionCompiler`: a small reader for a flag-comparison grammar,
/// `<flag> <op> <literal>` with `op` one of `==`, `!=`, `<`, `>` and `literal` a
/// boolean or signed integer. Anything else is reported invalid with a reason.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagConditionCompiler;

impl JsonConditionCompiler for FlagConditionCompiler {
    fn compile(&self, text: &[u8]) -> CompiledCondition {
        let id = IdBytes::new(text.to_vec());
        let text_str = match std::str::from_utf8(text) {
            Ok(s) => s.trim(),
            Err(_) => {
                return CompiledCondition::Invalid {
                    text: id,
                    reason: "condition expression must be valid UTF-8".to_string(),
                }
            }
        };
        match parse_flag_condition(text_str) {
            Ok(()) => CompiledCondition::Valid { text: id },
            Err(reason) => CompiledCondition::Invalid { text: id, reason },
        }
    }
}

/// Parses `<flag> <op> <literal>`, validating shape only — the compiled form stores
/// the original text, not a decomposed AST, since the core never evaluates conditions.
fn parse_flag_condition(expr: &str) -> Result<(), String> {
    const OPS: [&str; 4] = ["==", "!=", "<", ">"];
    let op = OPS
        .iter()
        .find(|op| expr.contains(*op))
        .ok_or_else(|| format!("condition '{expr}' has no recognized comparison operator"))?;

    let mut parts = expr.splitn(2, op);
    let flag = parts.next().unwrap_or("").trim();
    let literal = parts.next().unwrap_or("").trim();

    if flag.is_empty() {
        return Err(format!("condition '{expr}' is missing a flag name"));
    }
    if literal.is_empty() {
        return Err(format!("condition '{expr}' is missing a literal value"));
    }
    // The literal is parsed as a JSON scalar (the grammar is a "JSON condition"):
    // this accepts `true`/`false` and signed integers while rejecting strings,
    // floats, and anything else a bare `i64::parse` would have let slip through.
    match serde_json::from_str::<serde_json::Value>(literal) {
        Ok(serde_json::Value::Bool(_)) => {}
        Ok(serde_json::Value::Number(n)) if n.is_i64() || n.is_u64() => {}
        _ => {
            return Err(format!(
                "condition '{expr}' literal '{literal}' is neither a boolean nor an integer"
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonpath_lib_compiler_accepts_root_path() {
        let c = JsonPathLibCompiler;
        let result = c.compile(b"$").unwrap();
        assert!(result.is_valid());
    }

    #[test]
    fn jsonpath_lib_compiler_rejects_bare_identifier() {
        let c = JsonPathLibCompiler;
        let result = c.compile(b"foo").unwrap();
        assert!(!result.is_valid());
        assert!(result.reason().is_some());
    }

    #[test]
    fn flag_condition_compiler_accepts_simple_comparison() {
        let c = FlagConditionCompiler;
        assert!(c.compile(b"approved == true").is_valid());
        assert!(c.compile(b"retries > 3").is_valid());
    }

    #[test]
    fn flag_condition_compiler_rejects_missing_operator() {
        let c = FlagConditionCompiler;
        let compiled = c.compile(b"garbage");
        assert!(!compiled.is_valid());
        assert!(compiled.reason().unwrap().contains("no recognized comparison operator"));
    }

    #[test]
    fn flag_condition_compiler_rejects_non_literal_value() {
        let c = FlagConditionCompiler;
        let compiled = c.compile(b"flag == maybe");
        assert!(!compiled.is_valid());
    }
}
