//! Return-value patch rules.
//!
//! A rule is evaluated by the generated program inside the target
//! process; this module only models it and checks that it fits the
//! method's return type.

use std::fmt;

use crate::error::{DomainError, DomainResult};
use crate::types;

/// How a patched return value is computed.
///
/// Persisted by name. Unknown names decode to [`ReturnPatchMode::Constant`]
/// so that saved hooks keep loading across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnPatchMode {
    /// A literal baked in at compile time
    #[default]
    Constant,
    /// A free expression evaluated per call
    Expression,
    /// A condition selecting a then/else expression
    Conditional,
    /// A full function body; `undefined` keeps the original value
    Script,
}

impl ReturnPatchMode {
    /// Persisted and emitted name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "CONSTANT",
            Self::Expression => "EXPRESSION",
            Self::Conditional => "CONDITIONAL",
            Self::Script => "SCRIPT",
        }
    }

    /// Parses a mode name, returning `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CONSTANT" => Some(Self::Constant),
            "EXPRESSION" => Some(Self::Expression),
            "CONDITIONAL" => Some(Self::Conditional),
            "SCRIPT" => Some(Self::Script),
            _ => None,
        }
    }

    /// Parses a mode name, falling back to the default for unknown names.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }
}

impl fmt::Display for ReturnPatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replacement rule for a hooked method's return value.
///
/// Only the fields of the selected mode are meaningful; the others are
/// kept so that switching modes in an editor does not lose input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReturnPatchRule {
    pub enabled: bool,
    pub mode: ReturnPatchMode,
    pub constant_value: String,
    pub expression: String,
    pub condition: String,
    pub then_value: String,
    pub else_value: String,
    pub script_body: String,
}

impl ReturnPatchRule {
    /// Enabled rule returning a constant.
    pub fn constant(value: impl Into<String>) -> Self {
        Self {
            enabled: true,
            mode: ReturnPatchMode::Constant,
            constant_value: value.into(),
            ..Self::default()
        }
    }

    /// Enabled rule returning the value of an expression.
    pub fn expression(expression: impl Into<String>) -> Self {
        Self {
            enabled: true,
            mode: ReturnPatchMode::Expression,
            expression: expression.into(),
            ..Self::default()
        }
    }

    /// Enabled conditional rule. An empty `else_value` keeps the original value.
    pub fn conditional(
        condition: impl Into<String>,
        then_value: impl Into<String>,
        else_value: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            mode: ReturnPatchMode::Conditional,
            condition: condition.into(),
            then_value: then_value.into(),
            else_value: else_value.into(),
            ..Self::default()
        }
    }

    /// Enabled rule running a function body.
    pub fn script(body: impl Into<String>) -> Self {
        Self {
            enabled: true,
            mode: ReturnPatchMode::Script,
            script_body: body.into(),
            ..Self::default()
        }
    }

    /// Returns true if the rule applies to a method with this return type.
    ///
    /// Void methods are never patchable, whatever the stored flag says.
    pub fn is_effective_for(&self, return_type: &str) -> bool {
        self.enabled && !types::is_void(return_type)
    }
}

/// Returns the verbatim payload of a `js:` / `raw:` constant.
///
/// Raw constants bypass every type-aware rendering and validation step.
/// The prefixes are lowercase only; `RAW:x` is an ordinary value.
pub fn raw_literal(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    trimmed
        .strip_prefix("js:")
        .or_else(|| trimmed.strip_prefix("raw:"))
        .map(str::trim)
}

/// Extracts the single character of a `char` constant (`a`, `'a'`, `"a"`).
pub fn char_literal(value: &str) -> Option<char> {
    let trimmed = value.trim();
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    let rest: Vec<char> = chars.collect();
    match rest.as_slice() {
        [] => Some(first),
        [inner, last] if (first == '\'' || first == '"') && *last == first => Some(*inner),
        _ => None,
    }
}

/// Checks a rule against the method's return type.
///
/// Disabled rules always pass. Mirrors what the hook editor enforces, so
/// the compiler can assume well-formed input.
///
/// # Errors
///
/// Returns [`DomainError::InvalidPatchRule`] with a user-facing message.
pub fn validate(return_type: &str, rule: &ReturnPatchRule) -> DomainResult<()> {
    if !rule.enabled {
        return Ok(());
    }
    if types::is_void(return_type) {
        return Err(invalid("Cannot modify return value for void methods."));
    }
    match rule.mode {
        ReturnPatchMode::Constant => validate_constant(return_type, &rule.constant_value),
        ReturnPatchMode::Expression => {
            require(&rule.expression, "Expression is empty.")
        }
        ReturnPatchMode::Conditional => {
            require(&rule.condition, "Conditional rule requires a condition.")?;
            require(&rule.then_value, "Conditional rule requires a THEN value.")
        }
        ReturnPatchMode::Script => require(&rule.script_body, "Script body is empty."),
    }
}

fn validate_constant(return_type: &str, value: &str) -> DomainResult<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(invalid("Constant value is empty."));
    }
    if raw_literal(trimmed).is_some() {
        return Ok(());
    }
    if types::is_boolean(return_type) {
        let lower = trimmed.to_ascii_lowercase();
        if lower != "true" && lower != "false" {
            return Err(invalid("Boolean return type requires true/false."));
        }
    } else if types::is_numeric(return_type) {
        if return_type == "char" && char_literal(trimmed).is_some() {
            return Ok(());
        }
        if trimmed.parse::<f64>().is_err() {
            return Err(invalid("Numeric return type requires a number."));
        }
    }
    Ok(())
}

fn require(value: &str, message: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(invalid(message))
    } else {
        Ok(())
    }
}

fn invalid(message: &str) -> DomainError {
    DomainError::InvalidPatchRule(message.to_string())
}
