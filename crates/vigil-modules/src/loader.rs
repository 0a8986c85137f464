//! Asynchronous module loading with stub fallback
//!
//! [`FallbackResolver::resolve`] returns immediately with whatever the
//! registry can offer (a stub if need be) and, when it had to stub, starts a
//! background load over the primary path and then each alternate path. The
//! whole sequence is bounded by a single timeout.
//!
//! Callers that captured the stub before the load finished keep the stub;
//! only fresh reads through the registry observe the real module. Re-resolve
//! after awaiting the returned handle when the real module matters.

use crate::capability::Capability;
use crate::error::ModuleError;
use crate::registry::{LookupStep, ModuleRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default bound on a background load
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Where to find a module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    /// Expected binding name
    pub name: String,
    /// First path tried
    pub primary_path: String,
    /// Tried in order after the primary path fails
    pub alternate_paths: Vec<String>,
}

impl ModuleSpec {
    /// Create spec with a primary path
    #[must_use]
    pub fn new(name: impl Into<String>, primary_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_path: primary_path.into(),
            alternate_paths: Vec::new(),
        }
    }

    /// Add an alternate path
    #[must_use]
    pub fn with_alternate(mut self, path: impl Into<String>) -> Self {
        self.alternate_paths.push(path.into());
        self
    }

    /// Primary then alternates
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary_path.as_str()).chain(self.alternate_paths.iter().map(String::as_str))
    }
}

/// Fetches a module from a path
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load the module expected to define `name` from `path`
    ///
    /// # Errors
    /// Returns [`ModuleError`] if the path cannot be loaded or does not
    /// define `name`.
    async fn load(&self, name: &str, path: &str) -> Result<Arc<dyn Capability>, ModuleError>;
}

/// One failed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAttempt {
    /// Path tried
    pub path: String,
    /// Why it failed
    pub error: String,
}

/// Result of a background load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Real module installed from `path`
    Loaded {
        /// Path that succeeded
        path: String,
    },
    /// Loaded, but the stub had already been replaced by someone else
    Superseded {
        /// Path that succeeded
        path: String,
    },
    /// Every path failed; the stub stays bound
    Failed {
        /// Per-path failures in order
        attempts: Vec<LoadAttempt>,
    },
    /// Timeout elapsed; the stub stays bound
    TimedOut {
        /// Failures recorded before the timeout
        attempts: Vec<LoadAttempt>,
    },
}

/// Immediate answer from [`FallbackResolver::resolve`]
#[derive(Debug)]
pub struct Resolution {
    /// Module usable right now; may be a stub
    pub module: Arc<dyn Capability>,
    /// Lookup step when an existing binding matched
    pub step: Option<LookupStep>,
    /// Background load, present only when a stub was handed out
    pub pending: Option<JoinHandle<LoadOutcome>>,
}

impl Resolution {
    /// Whether the module handed out is a stub
    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.module.is_stub()
    }
}

/// Layered lookup plus background loading
#[derive(Clone)]
pub struct FallbackResolver {
    registry: Arc<ModuleRegistry>,
    loader: Arc<dyn ModuleLoader>,
    timeout: Duration,
}

impl std::fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResolver")
            .field("modules", &self.registry.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl FallbackResolver {
    /// Create resolver with [`DEFAULT_LOAD_TIMEOUT`]
    #[must_use]
    pub fn new(registry: Arc<ModuleRegistry>, loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            registry,
            loader,
            timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    /// Set the load timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Registry this resolver writes to
    #[must_use]
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Resolve `spec.name`
    ///
    /// A real binding found by any lookup step is returned as is. Otherwise
    /// a stub is bound (or the existing stub reused) and a background load
    /// is spawned. Must be called from within a Tokio runtime.
    pub fn resolve(&self, spec: &ModuleSpec) -> Resolution {
        if let Some(found) = self.registry.lookup(&spec.name) {
            if !found.binding.is_stub() {
                if found.name != spec.name {
                    self.registry.alias(spec.name.clone(), found.name.clone());
                }
                return Resolution {
                    module: found.binding.module,
                    step: Some(found.step),
                    pending: None,
                };
            }
        }

        let stub = self.registry.bind_stub(&spec.name);
        let pending = tokio::spawn(load_real(
            Arc::clone(&self.registry),
            Arc::clone(&self.loader),
            spec.clone(),
            stub.generation,
            self.timeout,
        ));

        Resolution {
            module: stub.module,
            step: None,
            pending: Some(pending),
        }
    }
}

async fn load_real(
    registry: Arc<ModuleRegistry>,
    loader: Arc<dyn ModuleLoader>,
    spec: ModuleSpec,
    generation: u64,
    timeout: Duration,
) -> LoadOutcome {
    let mut attempts = Vec::new();

    let found = tokio::time::timeout(timeout, async {
        for path in spec.paths() {
            match loader.load(&spec.name, path).await {
                Ok(module) => return Some((path.to_string(), module)),
                Err(e) => {
                    tracing::warn!(module = %spec.name, path, error = %e, "module path failed");
                    attempts.push(LoadAttempt {
                        path: path.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        None
    })
    .await;

    match found {
        Ok(Some((path, module))) => {
            if registry.replace_stub(&spec.name, module, generation) {
                tracing::info!(module = %spec.name, path = %path, "real module replaced stub");
                LoadOutcome::Loaded { path }
            } else {
                tracing::info!(module = %spec.name, path = %path, "stub already replaced, discarding load");
                LoadOutcome::Superseded { path }
            }
        }
        Ok(None) => {
            tracing::error!(module = %spec.name, attempts = attempts.len(), "all module paths failed, keeping stub");
            LoadOutcome::Failed { attempts }
        }
        Err(_) => {
            tracing::error!(module = %spec.name, timeout_ms = timeout.as_millis() as u64, "module load timed out, keeping stub");
            LoadOutcome::TimedOut { attempts }
        }
    }
}

type Factory = Arc<dyn Fn() -> Arc<dyn Capability> + Send + Sync>;

/// Loader backed by an in-process table of path to factory
///
/// Stands in for fetching script files; `latency` simulates network time.
#[derive(Clone, Default)]
pub struct ManifestLoader {
    entries: HashMap<String, Factory>,
    latency: Duration,
}

impl std::fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<_> = self.entries.keys().collect();
        paths.sort();
        f.debug_struct("ManifestLoader")
            .field("paths", &paths)
            .field("latency", &self.latency)
            .finish()
    }
}

impl ManifestLoader {
    /// Create empty loader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the module built by `factory` at `path`
    #[must_use]
    pub fn with_module<F>(mut self, path: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Capability> + Send + Sync + 'static,
    {
        self.entries.insert(path.into(), Arc::new(factory));
        self
    }

    /// Delay every load by `latency`
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    async fn load(&self, name: &str, path: &str) -> Result<Arc<dyn Capability>, ModuleError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let factory = self.entries.get(path).ok_or_else(|| ModuleError::LoadFailed {
            path: path.to_string(),
            reason: "not found".into(),
        })?;
        let module = factory();
        if module.name() != name {
            return Err(ModuleError::BindingMismatch {
                path: path.to_string(),
                expected: name.to_string(),
                found: module.name().to_string(),
            });
        }
        Ok(module)
    }
}
