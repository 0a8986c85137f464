//! Module registry with layered lookup
//!
//! Bindings live in a concurrent map so the async loader can swap a stub for
//! the real module while the page keeps running. Lookup proceeds in order:
//! exact name, alias table, case-insensitive name, fuzzy substring. When all
//! four miss, [`ModuleRegistry::resolve`] binds a [`StubModule`] so the name is
//! never left unbound.

use crate::capability::Capability;
use crate::stub::StubModule;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Where a binding came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingOrigin {
    /// Real implementation
    Real,
    /// Fallback stand-in
    Stub,
}

/// Lookup step that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupStep {
    /// Exact name
    Exact,
    /// Alias table
    Alias,
    /// Case-insensitive name
    CaseInsensitive,
    /// Normalized substring match
    Fuzzy,
}

/// A bound module
#[derive(Debug, Clone)]
pub struct Binding {
    /// The module
    pub module: Arc<dyn Capability>,
    /// Real or stub
    pub origin: BindingOrigin,
    /// Monotonic bind counter; used to detect concurrent rebinding
    pub generation: u64,
}

impl Binding {
    /// Whether this is a stub
    #[inline]
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.origin == BindingOrigin::Stub
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Name the binding is stored under
    pub name: String,
    /// The binding
    pub binding: Binding,
    /// Step that matched
    pub step: LookupStep,
}

/// Concurrent capability registry
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    bindings: DashMap<String, Binding>,
    aliases: DashMap<String, String>,
    generation: AtomicU64,
}

impl ModuleRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Bind a real module under its own name, replacing any previous binding
    pub fn register(&self, module: Arc<dyn Capability>) -> Option<Binding> {
        let name = module.name().to_string();
        self.register_as(name, module)
    }

    /// Bind a real module under `name`
    pub fn register_as(&self, name: impl Into<String>, module: Arc<dyn Capability>) -> Option<Binding> {
        let name = name.into();
        let binding = Binding {
            module,
            origin: BindingOrigin::Real,
            generation: self.next_generation(),
        };
        tracing::debug!(module = %name, generation = binding.generation, "module registered");
        self.bindings.insert(name, binding)
    }

    /// Add an alias; lookups for `alias` resolve to `target`
    pub fn alias(&self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Remove a binding
    pub fn unbind(&self, name: &str) -> Option<Binding> {
        self.bindings.remove(name).map(|(_, b)| b)
    }

    /// Binding stored under exactly `name`, or under its alias target
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<Binding> {
        if let Some(b) = self.bindings.get(name) {
            return Some(b.clone());
        }
        let target = self.aliases.get(name).map(|t| t.value().clone())?;
        self.bindings.get(&target).map(|b| b.clone())
    }

    /// Module bound under `name` (alias-aware)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.binding(name).map(|b| b.module)
    }

    /// Whether `name` is bound to a real module
    #[must_use]
    pub fn is_real(&self, name: &str) -> bool {
        self.binding(name).is_some_and(|b| !b.is_stub())
    }

    /// All bound names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of bindings
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Find a binding for `name` without creating one
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Resolved> {
        if let Some(b) = self.bindings.get(name) {
            return Some(Resolved {
                name: name.to_string(),
                binding: b.clone(),
                step: LookupStep::Exact,
            });
        }

        if let Some(target) = self.alias_target(name) {
            if let Some(b) = self.bindings.get(&target) {
                return Some(Resolved {
                    name: target,
                    binding: b.clone(),
                    step: LookupStep::Alias,
                });
            }
        }

        let names = self.names();
        if let Some(found) = names.iter().find(|n| n.eq_ignore_ascii_case(name)) {
            if let Some(b) = self.bindings.get(found) {
                return Some(Resolved {
                    name: found.clone(),
                    binding: b.clone(),
                    step: LookupStep::CaseInsensitive,
                });
            }
        }

        let wanted = normalize(name);
        if wanted.is_empty() {
            return None;
        }
        let best = names
            .iter()
            .filter(|n| {
                let candidate = normalize(n);
                !candidate.is_empty() && (candidate.contains(&wanted) || wanted.contains(&candidate))
            })
            .min_by_key(|n| normalize(n).len().abs_diff(wanted.len()))?;
        self.bindings.get(best).map(|b| Resolved {
            name: best.clone(),
            binding: b.clone(),
            step: LookupStep::Fuzzy,
        })
    }

    fn alias_target(&self, name: &str) -> Option<String> {
        if let Some(t) = self.aliases.get(name) {
            return Some(t.value().clone());
        }
        self.aliases
            .iter()
            .find(|e| e.key().eq_ignore_ascii_case(name))
            .map(|e| e.value().clone())
    }

    /// Bind a stub under `name` unless something is already bound there
    ///
    /// Returns the binding now in place.
    pub fn bind_stub(&self, name: &str) -> Binding {
        self.bindings
            .entry(name.to_string())
            .or_insert_with(|| {
                let generation = self.next_generation();
                tracing::warn!(module = %name, generation, "binding stub module");
                Binding {
                    module: Arc::new(StubModule::new(name)),
                    origin: BindingOrigin::Stub,
                    generation,
                }
            })
            .clone()
    }

    /// Replace the stub under `name` with a real module
    ///
    /// Succeeds only while the stub bound at `generation` is still in place,
    /// so a late load never clobbers a module registered in the meantime.
    pub fn replace_stub(&self, name: &str, module: Arc<dyn Capability>, generation: u64) -> bool {
        let Some(mut entry) = self.bindings.get_mut(name) else {
            return false;
        };
        if !entry.is_stub() || entry.generation != generation {
            return false;
        }
        *entry = Binding {
            module,
            origin: BindingOrigin::Real,
            generation: self.next_generation(),
        };
        true
    }

    /// Resolve `name` to a module, binding a stub when nothing matches
    ///
    /// Non-exact matches also record `name` as an alias of the matched
    /// binding, so later exact reads see the same module.
    pub fn resolve(&self, name: &str) -> Resolved {
        if let Some(found) = self.lookup(name) {
            if found.step != LookupStep::Exact && found.name != name {
                self.alias(name, found.name.clone());
            }
            return found;
        }
        Resolved {
            name: name.to_string(),
            binding: self.bind_stub(name),
            step: LookupStep::Exact,
        }
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModuleError;
    use vigil_dom::Document;

    #[derive(Debug)]
    struct Real(&'static str);

    impl Capability for Real {
        fn name(&self) -> &str {
            self.0
        }
        fn init(&self, _doc: &mut Document) -> Result<(), ModuleError> {
            Ok(())
        }
        fn render(&self, _doc: &mut Document) -> Result<(), ModuleError> {
            Ok(())
        }
        fn switch_tab(&self, _doc: &mut Document, _tab: &str) -> Result<(), ModuleError> {
            Ok(())
        }
    }

    #[test]
    fn exact_match_wins() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(Real("orgChart")));
        let found = registry.lookup("orgChart").unwrap();
        assert_eq!(found.step, LookupStep::Exact);
        assert_eq!(found.binding.origin, BindingOrigin::Real);
    }

    #[test]
    fn alias_then_case_then_fuzzy() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(Real("raciMatrix")));
        registry.register(Arc::new(Real("orgChart")));
        registry.alias("RACI", "raciMatrix");

        assert_eq!(registry.lookup("RACI").unwrap().step, LookupStep::Alias);
        assert_eq!(registry.lookup("raci").unwrap().step, LookupStep::Alias);
        assert_eq!(registry.lookup("ORGCHART").unwrap().step, LookupStep::CaseInsensitive);

        let fuzzy = registry.lookup("org_chart_module").unwrap();
        assert_eq!(fuzzy.step, LookupStep::Fuzzy);
        assert_eq!(fuzzy.name, "orgChart");
    }

    #[test]
    fn resolve_binds_stub_when_nothing_matches() {
        let registry = ModuleRegistry::new();
        let resolved = registry.resolve("config");
        assert!(resolved.binding.is_stub());
        assert!(resolved.binding.module.is_stub());
        assert!(registry.get("config").is_some());
        assert!(!registry.is_real("config"));
    }

    #[test]
    fn resolve_records_alias_for_near_miss() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(Real("ui")));
        let resolved = registry.resolve("UI");
        assert_eq!(resolved.step, LookupStep::CaseInsensitive);
        assert!(registry.is_real("UI"));
    }

    #[test]
    fn replace_stub_requires_matching_generation() {
        let registry = ModuleRegistry::new();
        let stub = registry.bind_stub("ui");
        assert!(!registry.replace_stub("ui", Arc::new(Real("ui")), stub.generation + 7));
        assert!(registry.replace_stub("ui", Arc::new(Real("ui")), stub.generation));
        assert!(registry.is_real("ui"));

        // Second replace sees a real binding and refuses
        assert!(!registry.replace_stub("ui", Arc::new(Real("ui")), stub.generation));
    }

    #[test]
    fn bind_stub_keeps_existing_real_module() {
        let registry = ModuleRegistry::new();
        registry.register(Arc::new(Real("config")));
        let binding = registry.bind_stub("config");
        assert_eq!(binding.origin, BindingOrigin::Real);
    }
}
