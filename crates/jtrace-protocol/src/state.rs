//! Persisted hook workspace document.
//!
//! JSON layout (camelCase keys):
//!
//! ```json
//! {
//!   "version": 1,
//!   "hooks": [{ "hookKey": "...", "active": true, "target": {...}, ... }],
//!   "customScriptPaths": "1|/path/a.js"
//! }
//! ```
//!
//! Missing fields take model defaults. Unknown patch modes decode as
//! `CONSTANT` and unknown snippet positions as `APPEND`, so documents from
//! older or newer writers load without changing hook semantics.

use chrono::{DateTime, Utc};
use jtrace_core::{
    HookRegistry, HookSpec, MethodTarget, ReturnPatchMode, ReturnPatchRule, ScriptOptions,
    SnippetPosition, TemplateSelection,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Current document version.
pub const STATE_VERSION: u32 = 1;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum StateError {
    #[error("invalid state document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported state version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

pub type Result<T> = std::result::Result<T, StateError>;

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedState {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub hooks: Vec<HookEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_script_paths: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl Default for SavedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            hooks: Vec::new(),
            custom_script_paths: String::new(),
            saved_at: None,
        }
    }
}

impl SavedState {
    /// Snapshots a registry, in registration order.
    pub fn from_registry(registry: &HookRegistry, custom_script_paths: &str) -> Self {
        Self {
            version: STATE_VERSION,
            hooks: registry
                .iter()
                .map(|h| HookEntry::from_spec(&h.spec, h.record.is_active()))
                .collect(),
            custom_script_paths: custom_script_paths.to_string(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Rebuilds a registry. Entries without a key or target are skipped.
    pub fn to_registry(&self) -> HookRegistry {
        let mut registry = HookRegistry::new();
        for entry in &self.hooks {
            if let Some(spec) = entry.to_spec() {
                registry.insert_restored(spec, entry.active);
            }
        }
        registry
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let state: SavedState = serde_json::from_str(json)?;
        if state.version > STATE_VERSION {
            return Err(StateError::UnsupportedVersion {
                found: state.version,
                supported: STATE_VERSION,
            });
        }
        Ok(state)
    }
}

// ============================================================================
// Hook Entries
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookEntry {
    #[serde(default)]
    pub hook_key: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub target: Option<MethodTargetData>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: ScriptOptionsData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub patch_rule: ReturnPatchRuleData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub extra_script: String,
    #[serde(default = "default_position", deserialize_with = "null_as_position")]
    pub template_position: String,
    #[serde(default)]
    pub template_enabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub template_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub template_content: String,
}

impl HookEntry {
    pub fn from_spec(spec: &HookSpec, active: bool) -> Self {
        Self {
            hook_key: Some(spec.hook_id().to_string()),
            active,
            target: Some(MethodTargetData::from_target(&spec.target)),
            options: ScriptOptionsData::from(spec.options),
            patch_rule: ReturnPatchRuleData::from(&spec.patch),
            extra_script: spec.extra_script.clone(),
            template_position: spec.position.as_str().to_string(),
            template_enabled: spec.template.enabled,
            template_name: spec.template.name.clone(),
            template_content: spec.template.content.clone(),
        }
    }

    /// Converts back to a spec, or `None` when the entry has no usable key
    /// or target.
    pub fn to_spec(&self) -> Option<HookSpec> {
        let key = self.hook_key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        let target = self.target.as_ref()?.to_target();

        let spec = HookSpec::new(target, self.options.to_options())
            .with_patch(self.patch_rule.to_rule())
            .with_snippet(
                self.extra_script.clone(),
                SnippetPosition::from_name_or_default(&self.template_position),
            )
            .with_template(TemplateSelection {
                enabled: self.template_enabled,
                name: self.template_name.clone(),
                content: self.template_content.clone(),
            })
            .with_hook_id(key);
        Some(spec)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodTargetData {
    #[serde(deserialize_with = "null_as_default")]
    pub class_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub method_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub return_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub arg_types: Vec<String>,
    pub is_static: bool,
    pub is_constructor: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub display_signature: String,
}

impl MethodTargetData {
    pub fn from_target(target: &MethodTarget) -> Self {
        Self {
            class_name: target.class_name().to_string(),
            method_name: target.method_name().to_string(),
            return_type: target.return_type().to_string(),
            arg_types: target.arg_types().to_vec(),
            is_static: target.is_static(),
            is_constructor: target.is_constructor(),
            display_signature: target.display_signature().to_string(),
        }
    }

    pub fn to_target(&self) -> MethodTarget {
        MethodTarget::from_parts(
            self.class_name.clone(),
            self.method_name.clone(),
            self.return_type.clone(),
            self.arg_types.clone(),
            self.is_static,
            self.is_constructor,
            self.display_signature.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScriptOptionsData {
    pub log_args: bool,
    pub log_return: bool,
    pub log_thread: bool,
    pub print_stack: bool,
    pub print_this: bool,
    pub pretty_print: bool,
}

impl Default for ScriptOptionsData {
    fn default() -> Self {
        Self::from(ScriptOptions::default())
    }
}

impl From<ScriptOptions> for ScriptOptionsData {
    fn from(o: ScriptOptions) -> Self {
        Self {
            log_args: o.log_args,
            log_return: o.log_return,
            log_thread: o.log_thread,
            print_stack: o.print_stack,
            print_this: o.print_this,
            pretty_print: o.pretty_print,
        }
    }
}

impl ScriptOptionsData {
    pub fn to_options(&self) -> ScriptOptions {
        ScriptOptions {
            log_args: self.log_args,
            log_return: self.log_return,
            log_thread: self.log_thread,
            print_stack: self.print_stack,
            print_this: self.print_this,
            pretty_print: self.pretty_print,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReturnPatchRuleData {
    pub enabled: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub mode: String,
    #[serde(deserialize_with = "null_as_default")]
    pub constant_value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub expression: String,
    #[serde(deserialize_with = "null_as_default")]
    pub condition: String,
    #[serde(deserialize_with = "null_as_default")]
    pub then_value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub else_value: String,
    #[serde(deserialize_with = "null_as_default")]
    pub script_body: String,
}

impl Default for ReturnPatchRuleData {
    fn default() -> Self {
        Self::from(&ReturnPatchRule::default())
    }
}

impl From<&ReturnPatchRule> for ReturnPatchRuleData {
    fn from(rule: &ReturnPatchRule) -> Self {
        Self {
            enabled: rule.enabled,
            mode: rule.mode.as_str().to_string(),
            constant_value: rule.constant_value.clone(),
            expression: rule.expression.clone(),
            condition: rule.condition.clone(),
            then_value: rule.then_value.clone(),
            else_value: rule.else_value.clone(),
            script_body: rule.script_body.clone(),
        }
    }
}

impl ReturnPatchRuleData {
    pub fn to_rule(&self) -> ReturnPatchRule {
        ReturnPatchRule {
            enabled: self.enabled,
            mode: ReturnPatchMode::from_name_or_default(&self.mode),
            constant_value: self.constant_value.clone(),
            expression: self.expression.clone(),
            condition: self.condition.clone(),
            then_value: self.then_value.clone(),
            else_value: self.else_value.clone(),
            script_body: self.script_body.clone(),
        }
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

fn default_version() -> u32 {
    STATE_VERSION
}

fn default_true() -> bool {
    true
}

fn default_position() -> String {
    SnippetPosition::default().as_str().to_string()
}

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_position<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_position))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spec() -> HookSpec {
        let target = MethodTarget::new(
            "com.example.Api",
            "login",
            "boolean",
            vec!["java.lang.String".to_string()],
        );
        HookSpec::new(target, ScriptOptions::default())
            .with_patch(ReturnPatchRule::constant("true"))
            .with_snippet("console.log('x');", SnippetPosition::Prepend)
    }

    #[test]
    fn test_entry_from_spec_and_back() {
        let spec = sample_spec();
        let entry = HookEntry::from_spec(&spec, false);
        assert_eq!(entry.hook_key.as_deref(), Some("com.example.Api.login(java.lang.String):boolean"));
        assert_eq!(entry.template_position, "PREPEND");
        assert_eq!(entry.patch_rule.mode, "CONSTANT");
        assert!(!entry.active);

        let restored = entry.to_spec().unwrap();
        assert_eq!(restored, spec);
    }

    #[test]
    fn test_entry_without_key_is_dropped() {
        let mut entry = HookEntry::from_spec(&sample_spec(), true);
        entry.hook_key = None;
        assert!(entry.to_spec().is_none());

        let mut entry = HookEntry::from_spec(&sample_spec(), true);
        entry.target = None;
        assert!(entry.to_spec().is_none());
    }

    #[test]
    fn test_unknown_names_fall_back() {
        let json = r#"{
            "hookKey": "k",
            "target": {"className": "A", "methodName": "m", "returnType": "int"},
            "patchRule": {"enabled": true, "mode": "BOGUS", "constantValue": "1"},
            "templatePosition": "SIDEWAYS"
        }"#;
        let entry: HookEntry = serde_json::from_str(json).unwrap();
        let spec = entry.to_spec().unwrap();
        assert_eq!(spec.patch.mode, ReturnPatchMode::Constant);
        assert_eq!(spec.position, SnippetPosition::Append);
        assert!(entry.active);
        assert_eq!(spec.options, ScriptOptions::default());
        assert_eq!(spec.hook_id(), "k");
    }

    #[test]
    fn test_registry_roundtrip_keeps_order_and_flags() {
        let mut registry = HookRegistry::new();
        registry.upsert(sample_spec(), None);
        let ctor = HookSpec::new(
            MethodTarget::constructor("com.example.Session", vec![]),
            ScriptOptions::default(),
        );
        let ctor_key = ctor.hook_id().to_string();
        registry.upsert(ctor, None);
        registry.set_active(&ctor_key, false).unwrap();

        let state = SavedState::from_registry(&registry, "1|/tmp/a.js");
        let json = state.to_json().unwrap();
        let loaded = SavedState::from_json(&json).unwrap();
        assert_eq!(loaded.custom_script_paths, "1|/tmp/a.js");

        let restored = loaded.to_registry();
        let keys: Vec<&str> = restored.records().iter().map(|r| r.key()).collect();
        assert_eq!(
            keys,
            vec!["com.example.Api.login(java.lang.String):boolean", ctor_key.as_str()]
        );
        assert!(!restored.record(&ctor_key).unwrap().is_active());
        assert_eq!(restored.active_specs().len(), 1);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = SavedState::from_json(r#"{"version": 9, "hooks": []}"#).unwrap_err();
        assert!(matches!(err, StateError::UnsupportedVersion { found: 9, .. }));
    }

    #[test]
    fn test_empty_document() {
        let state = SavedState::from_json("{}").unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.hooks.is_empty());
        assert!(state.to_registry().is_empty());
    }
}
