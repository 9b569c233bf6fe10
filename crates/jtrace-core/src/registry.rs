//! Insertion-ordered registry of configured hooks.
//!
//! The registry owns every [`HookSpec`] together with its [`HookRecord`].
//! Order matters: the compiled program numbers hook blocks in registry
//! order, so re-registering a target replaces its spec in place.

use tracing::debug;

use crate::error::{DomainError, DomainResult};
use crate::hook::{HookRecord, HookSpec, SourceRef};
use crate::method::MethodTarget;

/// A spec and its runtime record, stored under the same key.
#[derive(Debug, Clone)]
pub struct RegisteredHook {
    pub spec: HookSpec,
    pub record: HookRecord,
}

/// Ordered collection of hooks keyed by hook id.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    entries: Vec<RegisteredHook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec, replacing any spec with the same key.
    ///
    /// A replaced hook keeps its position and active flag; its source
    /// reference is only filled in when it had none. Returns `true` when
    /// the key was new.
    pub fn upsert(&mut self, spec: HookSpec, source: Option<SourceRef>) -> bool {
        if let Some(existing) = self.find_mut(spec.hook_id()) {
            debug!(key = spec.hook_id(), "Updating hook");
            if existing.record.source().is_none() && source.is_some() {
                existing.record.set_source(source);
            }
            existing.spec = spec;
            return false;
        }

        debug!(key = spec.hook_id(), "Registering hook");
        let record = HookRecord::new(
            spec.hook_id(),
            spec.target.display_signature(),
            source,
        );
        self.entries.push(RegisteredHook { spec, record });
        true
    }

    /// Restores a hook with an explicit active flag (used when loading state).
    pub fn insert_restored(&mut self, spec: HookSpec, active: bool) {
        let key = spec.hook_id().to_string();
        self.upsert(spec, None);
        if let Some(entry) = self.find_mut(&key) {
            entry.record.set_active(active);
        }
    }

    /// Removes a hook, returning it if it existed.
    pub fn remove(&mut self, key: &str) -> Option<RegisteredHook> {
        let idx = self.entries.iter().position(|e| e.record.key() == key)?;
        debug!(key, "Removing hook");
        Some(self.entries.remove(idx))
    }

    /// Removes every hook.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sets a hook's active flag. Returns `Ok(true)` when the flag changed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::HookNotFound`] for unknown keys.
    pub fn set_active(&mut self, key: &str, active: bool) -> DomainResult<bool> {
        let entry = self.find_mut(key).ok_or_else(|| DomainError::HookNotFound {
            key: key.to_string(),
        })?;
        if entry.record.is_active() == active {
            return Ok(false);
        }
        entry.record.set_active(active);
        Ok(true)
    }

    /// Sets the active flag of several hooks; unknown keys are skipped.
    /// Returns `true` if any flag changed.
    pub fn set_many_active<'a>(&mut self, keys: impl IntoIterator<Item = &'a str>, active: bool) -> bool {
        let mut changed = false;
        for key in keys {
            if let Ok(true) = self.set_active(key, active) {
                changed = true;
            }
        }
        changed
    }

    pub fn get(&self, key: &str) -> Option<&RegisteredHook> {
        self.entries.iter().find(|e| e.record.key() == key)
    }

    pub fn spec(&self, key: &str) -> Option<&HookSpec> {
        self.get(key).map(|e| &e.spec)
    }

    pub fn record(&self, key: &str) -> Option<&HookRecord> {
        self.get(key).map(|e| &e.record)
    }

    /// Iterates over all hooks in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredHook> {
        self.entries.iter()
    }

    /// Records in registration order.
    pub fn records(&self) -> Vec<&HookRecord> {
        self.entries.iter().map(|e| &e.record).collect()
    }

    /// Specs of active hooks in registration order; input to the compiler.
    pub fn active_specs(&self) -> Vec<&HookSpec> {
        self.entries
            .iter()
            .filter(|e| e.record.is_active())
            .map(|e| &e.spec)
            .collect()
    }

    /// Returns true if an active hook exists for the target.
    pub fn is_traced(&self, target: &MethodTarget) -> bool {
        self.record(target.hook_key())
            .map(HookRecord::is_active)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_mut(&mut self, key: &str) -> Option<&mut RegisteredHook> {
        self.entries.iter_mut().find(|e| e.record.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ScriptOptions;
    use crate::patch::ReturnPatchRule;

    fn spec(method: &str) -> HookSpec {
        HookSpec::new(
            MethodTarget::new("com.app.Api", method, "int", vec![]),
            ScriptOptions::default(),
        )
    }

    fn keys(registry: &HookRegistry) -> Vec<String> {
        registry.iter().map(|e| e.record.key().to_string()).collect()
    }

    #[test]
    fn test_upsert_appends_in_order() {
        let mut registry = HookRegistry::new();
        assert!(registry.upsert(spec("a"), None));
        assert!(registry.upsert(spec("b"), None));
        assert!(registry.upsert(spec("c"), None));
        assert_eq!(
            keys(&registry),
            vec!["com.app.Api.a():int", "com.app.Api.b():int", "com.app.Api.c():int"]
        );
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut registry = HookRegistry::new();
        registry.upsert(spec("a"), None);
        registry.upsert(spec("b"), None);
        registry.set_active("com.app.Api.a():int", false).unwrap();

        let replaced = spec("a").with_patch(ReturnPatchRule::constant("7"));
        assert!(!registry.upsert(replaced, None));

        assert_eq!(registry.len(), 2);
        assert_eq!(keys(&registry)[0], "com.app.Api.a():int");
        let entry = registry.get("com.app.Api.a():int").unwrap();
        assert_eq!(entry.spec.patch.constant_value, "7");
        assert!(!entry.record.is_active(), "replacing keeps the active flag");
    }

    #[test]
    fn test_disable_keeps_spec() {
        let mut registry = HookRegistry::new();
        registry.upsert(spec("a"), None);
        registry.upsert(spec("b"), None);

        assert!(registry.set_active("com.app.Api.a():int", false).unwrap());
        assert!(!registry.set_active("com.app.Api.a():int", false).unwrap());

        let active: Vec<&str> = registry.active_specs().iter().map(|s| s.hook_id()).collect();
        assert_eq!(active, vec!["com.app.Api.b():int"]);
        assert!(registry.spec("com.app.Api.a():int").is_some());

        assert!(registry.set_active("com.app.Api.a():int", true).unwrap());
        assert_eq!(registry.active_specs().len(), 2);
    }

    #[test]
    fn test_set_active_unknown_key() {
        let mut registry = HookRegistry::new();
        assert!(matches!(
            registry.set_active("nope", true),
            Err(DomainError::HookNotFound { .. })
        ));
    }

    #[test]
    fn test_set_many_active() {
        let mut registry = HookRegistry::new();
        registry.upsert(spec("a"), None);
        registry.upsert(spec("b"), None);

        let changed = registry.set_many_active(
            ["com.app.Api.a():int", "com.app.Api.b():int", "missing"],
            false,
        );
        assert!(changed);
        assert!(registry.active_specs().is_empty());
        assert!(!registry.set_many_active(["com.app.Api.a():int"], false));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut registry = HookRegistry::new();
        registry.upsert(spec("a"), None);
        registry.upsert(spec("b"), None);

        assert!(registry.remove("com.app.Api.a():int").is_some());
        assert!(registry.remove("com.app.Api.a():int").is_none());
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_is_traced() {
        let mut registry = HookRegistry::new();
        let target = MethodTarget::new("com.app.Api", "a", "int", vec![]);
        assert!(!registry.is_traced(&target));

        registry.upsert(spec("a"), None);
        assert!(registry.is_traced(&target));

        registry.set_active(target.hook_key(), false).unwrap();
        assert!(!registry.is_traced(&target));
    }

    #[test]
    fn test_insert_restored_inactive() {
        let mut registry = HookRegistry::new();
        registry.insert_restored(spec("a"), false);
        assert_eq!(registry.len(), 1);
        assert!(registry.active_specs().is_empty());
    }
}
