//! Built-in snippet templates offered when editing a hook.
//!
//! Templates run inside the hook body and may use its locals:
//! `TARGET_CLASS`, `TARGET_METHOD`, `METHOD_SIG`, `args`, `ret` (after the
//! call) and the shared helpers such as `safeToString` and `getStackTrace`.

use std::fmt;

/// A named snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    pub name: String,
    pub content: String,
}

impl ScriptTemplate {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// The built-in templates, `None` first.
    pub fn defaults() -> Vec<ScriptTemplate> {
        vec![
            Self::new("None", ""),
            Self::new(
                "Send JSON event",
                "send({type: 'trace', className: TARGET_CLASS, method: TARGET_METHOD});",
            ),
            Self::new("Log stack for every call", "console.log(getStackTrace());"),
            Self::new(
                "Dump this object",
                "try { console.log('this=' + safeToString(this)); } catch (e) {}",
            ),
        ]
    }

    /// Looks up a built-in template by name.
    pub fn find_default(name: &str) -> Option<ScriptTemplate> {
        Self::defaults().into_iter().find(|t| t.name == name)
    }
}

impl fmt::Display for ScriptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
