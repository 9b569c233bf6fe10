//! Hook specifications and their runtime records.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::method::MethodTarget;
use crate::options::ScriptOptions;
use crate::patch::ReturnPatchRule;

// ============================================================================
// Snippet Placement
// ============================================================================

/// Where an injected snippet runs relative to the original method.
///
/// Persisted by name. Unknown names decode to [`SnippetPosition::Append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SnippetPosition {
    /// Before the original implementation is invoked
    Prepend,
    /// After the original implementation returned
    #[default]
    Append,
}

impl SnippetPosition {
    /// Persisted name of the position.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepend => "PREPEND",
            Self::Append => "APPEND",
        }
    }

    /// Parses a persisted name, falling back to `Append`.
    pub fn from_name_or_default(name: &str) -> Self {
        match name {
            "PREPEND" => Self::Prepend,
            _ => Self::Append,
        }
    }

    /// Label shown in editors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Prepend => "Prepend (before call)",
            Self::Append => "Append (after call)",
        }
    }
}

/// Template the injected snippet was derived from.
///
/// Only used to restore the editor state; the compiler reads
/// [`HookSpec::extra_script`] directly.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateSelection {
    pub enabled: bool,
    pub name: String,
    pub content: String,
}

// ============================================================================
// Hook Specification
// ============================================================================

/// The unit of compilation: one method plus what to do when it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    pub target: MethodTarget,
    pub options: ScriptOptions,
    pub patch: ReturnPatchRule,
    /// Snippet injected into the hook body; empty means none
    pub extra_script: String,
    pub position: SnippetPosition,
    pub template: TemplateSelection,
    hook_id: String,
}

impl HookSpec {
    /// Creates a spec keyed by the target's display signature.
    pub fn new(target: MethodTarget, options: ScriptOptions) -> Self {
        let hook_id = target.hook_key().to_string();
        Self {
            target,
            options,
            patch: ReturnPatchRule::default(),
            extra_script: String::new(),
            position: SnippetPosition::default(),
            template: TemplateSelection::default(),
            hook_id,
        }
    }

    #[must_use]
    pub fn with_patch(mut self, patch: ReturnPatchRule) -> Self {
        self.patch = patch;
        self
    }

    #[must_use]
    pub fn with_snippet(mut self, code: impl Into<String>, position: SnippetPosition) -> Self {
        self.extra_script = code.into();
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: TemplateSelection) -> Self {
        self.template = template;
        self
    }

    /// Overrides the key, used when restoring saved hooks whose key
    /// predates a change in signature rendering.
    #[must_use]
    pub fn with_hook_id(mut self, hook_id: impl Into<String>) -> Self {
        self.hook_id = hook_id.into();
        self
    }

    /// Stable identifier of this hook.
    pub fn hook_id(&self) -> &str {
        &self.hook_id
    }

    /// The injected snippet and its placement, if any code is set.
    pub fn snippet(&self) -> Option<(&str, SnippetPosition)> {
        if self.extra_script.trim().is_empty() {
            None
        } else {
            Some((self.extra_script.as_str(), self.position))
        }
    }

    /// Whether the return patch is live for this target.
    pub fn patch_enabled(&self) -> bool {
        self.patch.is_effective_for(self.target.return_type())
    }
}

// ============================================================================
// Source References
// ============================================================================

/// A location in the analysed application a hook was created from.
///
/// Implemented by the decompiler integration; the core only uses it to
/// navigate back to the code.
pub trait SourceLocation: fmt::Debug + Send + Sync {
    /// Short human-readable description, e.g. `com.app.Api.java:42`.
    fn describe(&self) -> String;
}

/// Weak handle to a caller-owned [`SourceLocation`].
///
/// Never part of a hook's identity or of persisted state.
#[derive(Debug, Clone)]
pub struct SourceRef(Weak<dyn SourceLocation>);

impl SourceRef {
    /// Creates a weak reference to a location.
    pub fn new(location: &Arc<dyn SourceLocation>) -> Self {
        Self(Arc::downgrade(location))
    }

    /// Returns the location if the owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<dyn SourceLocation>> {
        self.0.upgrade()
    }
}

// ============================================================================
// Hook Record
// ============================================================================

/// Caller-visible runtime state of a registered hook.
///
/// Disabling a record removes its hook from the compiled program while
/// the spec stays registered for re-enabling.
#[derive(Debug, Clone)]
pub struct HookRecord {
    key: String,
    display: String,
    source: Option<SourceRef>,
    active: bool,
    script_id: i32,
    pending_unload: bool,
}

impl HookRecord {
    /// Creates an active record.
    pub fn new(key: impl Into<String>, display: impl Into<String>, source: Option<SourceRef>) -> Self {
        Self {
            key: key.into(),
            display: display.into(),
            source,
            active: true,
            script_id: -1,
            pending_unload: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<SourceRef>) {
        self.source = source;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Engine-side script id, `-1` when not loaded as a separate script.
    pub fn script_id(&self) -> i32 {
        self.script_id
    }

    pub fn set_script_id(&mut self, script_id: i32) {
        self.script_id = script_id;
    }

    pub fn is_pending_unload(&self) -> bool {
        self.pending_unload
    }

    pub fn set_pending_unload(&mut self, pending: bool) {
        self.pending_unload = pending;
    }
}

impl fmt::Display for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.pending_unload {
            "pending remove"
        } else if self.active {
            "active"
        } else {
            "inactive"
        };
        write!(f, "{} [{}]", self.display, state)
    }
}
