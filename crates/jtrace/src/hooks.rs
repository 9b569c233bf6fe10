//! Hook editing on the workspace.
//!
//! Hooks are named on the command line by signature:
//!
//! ```text
//! com.example.Api.check(java.lang.String, int):boolean
//! com.example.Api$Inner.<init>(long)
//! ```
//!
//! The return type may be omitted for `void` methods. Constructors may be
//! written `<init>` or `$init`. Generic parameters are erased.

use jtrace_core::{
    patch, types, HookSpec, MethodTarget, ScriptTemplate, TemplateSelection, CONSTRUCTOR_NAME,
};
use jtrace_core::{DomainError, RegisteredHook};
use tracing::info;

use crate::error::{CliError, Result};
use crate::workspace::WorkspaceState;

const JAVA_CONSTRUCTOR_NAME: &str = "<init>";

// ============================================================================
// Signature Parsing
// ============================================================================

/// Parses a hook signature into a target.
pub fn parse_signature(signature: &str, is_static: bool) -> Result<MethodTarget> {
    let text = signature.trim();
    let open = text
        .find('(')
        .ok_or_else(|| CliError::signature(signature, "missing '('"))?;
    let close = text
        .rfind(')')
        .filter(|close| *close > open)
        .ok_or_else(|| CliError::signature(signature, "missing ')'"))?;

    let head = text.get(..open).unwrap_or_default().trim();
    let (class_name, method_name) = head
        .rsplit_once('.')
        .ok_or_else(|| CliError::signature(signature, "expected Class.method"))?;
    let class_name = types::normalize_class_name(class_name.trim());
    let method_name = method_name.trim();
    if class_name.is_empty() || method_name.is_empty() {
        return Err(CliError::signature(signature, "expected Class.method"));
    }

    let args = split_arg_list(text.get(open + 1..close).unwrap_or_default());
    let tail = text.get(close + 1..).unwrap_or_default().trim();
    let return_type = match tail.strip_prefix(':') {
        Some(ret) if !ret.trim().is_empty() => types::strip_generics(ret.trim()).to_string(),
        Some(_) => return Err(CliError::signature(signature, "empty return type")),
        None if tail.is_empty() => "void".to_string(),
        None => return Err(CliError::signature(signature, "unexpected text after ')'")),
    };

    if method_name == JAVA_CONSTRUCTOR_NAME || method_name == CONSTRUCTOR_NAME {
        if is_static {
            return Err(CliError::signature(signature, "constructors cannot be static"));
        }
        return Ok(MethodTarget::constructor(class_name, args));
    }
    Ok(MethodTarget::new(class_name, method_name, return_type, args).with_static(is_static))
}

/// Splits `a, java.util.Map<K, V>, int[]` at top-level commas, erasing
/// generic parameters.
fn split_arg_list(list: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in list.chars() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    args.push(current);
    args.iter()
        .map(|arg| erase_generics(arg.trim()))
        .filter(|arg| !arg.is_empty())
        .collect()
}

/// `java.util.List<String>[]` → `java.util.List[]`.
fn erase_generics(type_name: &str) -> String {
    let base = types::strip_generics(type_name);
    let dims = type_name.get(base.len()..).map_or(0, |rest| {
        let after = rest.rfind('>').and_then(|i| rest.get(i + 1..)).unwrap_or("");
        after.matches("[]").count()
    });
    format!("{}{}", base.trim(), "[]".repeat(dims))
}

// ============================================================================
// Templates
// ============================================================================

/// Injects a built-in template as the hook's snippet.
pub fn apply_template(spec: HookSpec, name: &str) -> Result<HookSpec> {
    let template = ScriptTemplate::defaults()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| DomainError::InvalidFieldValue {
            field: "template".to_string(),
            value: name.to_string(),
            expected: template_names().join(", "),
        })?;
    let position = spec.position;
    Ok(spec
        .with_snippet(template.content.clone(), position)
        .with_template(TemplateSelection {
            enabled: !template.content.is_empty(),
            name: template.name,
            content: template.content,
        }))
}

/// Names of the built-in templates.
pub fn template_names() -> Vec<String> {
    ScriptTemplate::defaults().into_iter().map(|t| t.name).collect()
}

// ============================================================================
// Workspace Edits
// ============================================================================

/// Adds or replaces a hook after validating its return patch.
///
/// Returns `true` when the hook is new.
pub fn add_hook(state: &mut WorkspaceState, spec: HookSpec) -> Result<bool> {
    patch::validate(spec.target.return_type(), &spec.patch)?;
    let key = spec.hook_id().to_string();
    let added = state.registry.upsert(spec, None);
    info!(key = %key, added, "Hook saved");
    Ok(added)
}

/// Removes a hook by key.
pub fn remove_hook(state: &mut WorkspaceState, key: &str) -> Result<RegisteredHook> {
    state.registry.remove(key).ok_or_else(|| {
        DomainError::HookNotFound {
            key: key.to_string(),
        }
        .into()
    })
}

/// Enables or disables hooks by key. Every key must exist.
///
/// Returns how many hooks actually changed.
pub fn set_hooks_active(state: &mut WorkspaceState, keys: &[String], active: bool) -> Result<usize> {
    let mut changed = 0;
    for key in keys {
        if state.registry.set_active(key, active)? {
            changed += 1;
        }
    }
    Ok(changed)
}

/// One line per hook for `hooks list`.
pub fn describe_hooks(state: &WorkspaceState) -> Vec<String> {
    state
        .registry
        .iter()
        .enumerate()
        .map(|(idx, hook)| {
            let mut line = format!("{:>3}  {}", idx + 1, hook.record);
            let mut extras = Vec::new();
            if hook.spec.patch_enabled() {
                extras.push(format!("patch={}", hook.spec.patch.mode.as_str()));
            }
            if let Some((_, position)) = hook.spec.snippet() {
                extras.push(format!("snippet={}", position.as_str()));
            }
            if hook.spec.options.print_stack {
                extras.push("stack".to_string());
            }
            if !extras.is_empty() {
                line.push_str("  (");
                line.push_str(&extras.join(", "));
                line.push(')');
            }
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use jtrace_core::{ReturnPatchRule, ScriptOptions, SnippetPosition};

    #[test]
    fn test_parse_method_signature() {
        let target = parse_signature("com.example.Api.check(java.lang.String, int):boolean", false).unwrap();
        assert_eq!(target.class_name(), "com.example.Api");
        assert_eq!(target.method_name(), "check");
        assert_eq!(target.arg_types(), ["java.lang.String", "int"]);
        assert_eq!(target.return_type(), "boolean");
        assert_eq!(target.hook_key(), "com.example.Api.check(java.lang.String, int):boolean");
    }

    #[test]
    fn test_parse_void_default_and_static() {
        let target = parse_signature("a.B.run()", true).unwrap();
        assert_eq!(target.return_type(), "void");
        assert!(target.arg_types().is_empty());
        assert!(target.is_static());
    }

    #[test]
    fn test_parse_constructor_forms() {
        for sig in ["a.B.<init>(long)", "a.B.$init(long)"] {
            let target = parse_signature(sig, false).unwrap();
            assert!(target.is_constructor());
            assert_eq!(target.method_name(), "$init");
            assert_eq!(target.arg_types(), ["long"]);
        }
        assert!(parse_signature("a.B.<init>()", true).is_err());
    }

    #[test]
    fn test_parse_erases_generics() {
        let target = parse_signature(
            "a.B.put(java.util.Map<java.lang.String, java.lang.Integer>, java.util.List<a.C>[]):java.util.List<a.C>",
            false,
        )
        .unwrap();
        assert_eq!(target.arg_types(), ["java.util.Map", "java.util.List[]"]);
        assert_eq!(target.return_type(), "java.util.List");
    }

    #[test]
    fn test_parse_normalizes_anonymous_classes() {
        let target = parse_signature("a.Outer.AnonymousClass2.run()", false).unwrap();
        assert_eq!(target.class_name(), "a.Outer$2");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["a.B.c", "a.B.c(", "c()", "a.B.c():", "a.B.c() junk", ".c()"] {
            assert!(
                matches!(parse_signature(bad, false), Err(CliError::Signature { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_add_hook_validates_patch() {
        let mut state = WorkspaceState::default();
        let target = MethodTarget::new("a.B", "c", "void", vec![]);
        let spec = HookSpec::new(target, ScriptOptions::default())
            .with_patch(ReturnPatchRule::constant("1"));
        assert!(matches!(
            add_hook(&mut state, spec),
            Err(CliError::Domain(DomainError::InvalidPatchRule(_)))
        ));
        assert!(state.registry.is_empty());

        let target = MethodTarget::new("a.B", "ok", "boolean", vec![]);
        let spec = HookSpec::new(target, ScriptOptions::default())
            .with_patch(ReturnPatchRule::constant("TRUE"));
        assert!(add_hook(&mut state, spec.clone()).unwrap());
        assert!(!add_hook(&mut state, spec).unwrap());
        assert_eq!(state.registry.len(), 1);
    }

    #[test]
    fn test_enable_disable_and_remove() {
        let mut state = WorkspaceState::default();
        for name in ["one", "two"] {
            let target = MethodTarget::new("a.B", name, "void", vec![]);
            add_hook(&mut state, HookSpec::new(target, ScriptOptions::default())).unwrap();
        }
        let keys = vec!["a.B.one():void".to_string(), "a.B.two():void".to_string()];
        assert_eq!(set_hooks_active(&mut state, &keys, false).unwrap(), 2);
        assert_eq!(set_hooks_active(&mut state, &keys, false).unwrap(), 0);
        assert!(state.registry.active_specs().is_empty());

        assert!(set_hooks_active(&mut state, &["nope".to_string()], true).is_err());
        remove_hook(&mut state, "a.B.one():void").unwrap();
        assert!(remove_hook(&mut state, "a.B.one():void").is_err());
        assert_eq!(state.registry.len(), 1);
    }

    #[test]
    fn test_apply_template() {
        let target = MethodTarget::new("a.B", "c", "void", vec![]);
        let spec = HookSpec::new(target, ScriptOptions::default()).with_snippet("", SnippetPosition::Prepend);
        let spec = apply_template(spec, "log stack for every call").unwrap();
        assert_eq!(spec.extra_script, "console.log(getStackTrace());");
        assert_eq!(spec.position, SnippetPosition::Prepend);
        assert!(spec.template.enabled);
        assert_eq!(spec.template.name, "Log stack for every call");

        assert!(apply_template(spec, "missing").is_err());
    }

    #[test]
    fn test_describe_hooks() {
        let mut state = WorkspaceState::default();
        let target = MethodTarget::new("a.B", "ok", "boolean", vec![]);
        let spec = HookSpec::new(target, ScriptOptions::default())
            .with_patch(ReturnPatchRule::constant("true"))
            .with_snippet("send(1);", SnippetPosition::Append);
        add_hook(&mut state, spec).unwrap();

        let lines = describe_hooks(&state);
        assert_eq!(lines, vec!["  1  a.B.ok():boolean [active]  (patch=CONSTANT, snippet=APPEND)"]);
    }
}
