//! Hook targets: a single method or constructor of a target class.

use std::fmt;

use crate::types;

/// Method name the engine uses for constructors.
pub const CONSTRUCTOR_NAME: &str = "$init";

/// A fully resolved method in the target application.
///
/// Produced by the decompiler collaborator and immutable afterwards.
/// The display signature doubles as the hook key, so two targets with
/// the same signature are the same hook.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodTarget {
    class_name: String,
    method_name: String,
    return_type: String,
    arg_types: Vec<String>,
    is_static: bool,
    is_constructor: bool,
    display_signature: String,
}

impl MethodTarget {
    /// Creates a regular (non-constructor) method target.
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        return_type: impl Into<String>,
        arg_types: Vec<String>,
    ) -> Self {
        let mut target = Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            return_type: return_type.into(),
            arg_types,
            is_static: false,
            is_constructor: false,
            display_signature: String::new(),
        };
        target.display_signature = target.computed_signature();
        target
    }

    /// Creates a constructor target. Constructors return `void`.
    pub fn constructor(class_name: impl Into<String>, arg_types: Vec<String>) -> Self {
        let mut target = Self::new(class_name, CONSTRUCTOR_NAME, "void", arg_types);
        target.is_constructor = true;
        target
    }

    /// Marks the target as a static method.
    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Overrides the display signature.
    ///
    /// The decompiler may render names differently from the raw method
    /// info (e.g. inner classes). An empty signature keeps the computed one.
    #[must_use]
    pub fn with_display_signature(mut self, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        if !signature.is_empty() {
            self.display_signature = signature;
        }
        self
    }

    /// Restores a target from persisted fields.
    pub fn from_parts(
        class_name: String,
        method_name: String,
        return_type: String,
        arg_types: Vec<String>,
        is_static: bool,
        is_constructor: bool,
        display_signature: String,
    ) -> Self {
        Self::new(class_name, method_name, return_type, arg_types)
            .with_static(is_static)
            .with_constructor_flag(is_constructor)
            .with_display_signature(display_signature)
    }

    fn with_constructor_flag(mut self, is_constructor: bool) -> Self {
        self.is_constructor = is_constructor;
        self
    }

    fn computed_signature(&self) -> String {
        format!(
            "{}.{}({}):{}",
            self.class_name,
            self.method_name,
            self.arg_types.join(", "),
            self.return_type
        )
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn return_type(&self) -> &str {
        &self.return_type
    }

    pub fn arg_types(&self) -> &[String] {
        &self.arg_types
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    /// Human-readable signature, e.g. `com.app.Api.login(java.lang.String):boolean`.
    pub fn display_signature(&self) -> &str {
        &self.display_signature
    }

    /// Key under which hooks for this target are registered.
    pub fn hook_key(&self) -> &str {
        &self.display_signature
    }

    /// Returns true if the method returns `void` (constructors always do).
    pub fn returns_void(&self) -> bool {
        types::is_void(&self.return_type)
    }
}

impl fmt::Display for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_signature)
    }
}
