//! Supervisor configuration
//!
//! Loaded from TOML; every section and field has a default, so an empty
//! file is a valid configuration.
//!
//! ```toml
//! [recovery]
//! arm_delay_ms = 3000
//! keywords = ["tab", "content"]
//!
//! [watchdogs]
//! stall_threshold_ms = 5000
//!
//! [[modules.specs]]
//! name = "orgChart"
//! primary = "js/orgChart.js"
//! alternates = ["js/orgchart.js"]
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vigil_modules::ModuleSpec;
use vigil_recovery::{RecoveryConfig, WatchdogSettings};

/// Scheduler and runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Runtime tick period
    pub tick_interval_ms: u64,
    /// Capacity of the page event channel
    pub event_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            event_buffer: 64,
        }
    }
}

impl SchedulerConfig {
    /// Tick period as a duration
    #[inline]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Where one module can be loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    /// Binding name
    pub name: String,
    /// Primary path
    pub primary: String,
    /// Alternate paths, tried in order
    #[serde(default)]
    pub alternates: Vec<String>,
}

impl ModuleEntry {
    /// Create entry
    #[must_use]
    pub fn new(name: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary: primary.into(),
            alternates: Vec::new(),
        }
    }

    /// With an alternate path
    #[must_use]
    pub fn with_alternate(mut self, path: impl Into<String>) -> Self {
        self.alternates.push(path.into());
        self
    }

    /// Loader spec for this entry
    #[must_use]
    pub fn to_spec(&self) -> ModuleSpec {
        self.alternates
            .iter()
            .fold(ModuleSpec::new(&self.name, &self.primary), |spec, alt| spec.with_alternate(alt))
    }
}

/// Module resolution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    /// Bound on one background load
    pub load_timeout_ms: u64,
    /// Mis-cased or mistyped name to canonical name
    pub aliases: BTreeMap<String, String>,
    /// Modules the page expects
    pub specs: Vec<ModuleEntry>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        let aliases = [
            ("orgchart", "orgChart"),
            ("OrgChart", "orgChart"),
            ("raci", "raciMatrix"),
            ("RACIMatrix", "raciMatrix"),
            ("UI", "ui"),
            ("Config", "config"),
        ]
        .into_iter()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect();

        Self {
            load_timeout_ms: 10_000,
            aliases,
            specs: vec![
                ModuleEntry::new("config", "js/config.js"),
                ModuleEntry::new("ui", "js/ui.js"),
                ModuleEntry::new("orgChart", "js/orgChart.js")
                    .with_alternate("js/orgchart.js")
                    .with_alternate("js/org-chart.js"),
                ModuleEntry::new("raciMatrix", "js/raciMatrix.js").with_alternate("js/raci-matrix.js"),
            ],
        }
    }
}

impl ModulesConfig {
    /// Load timeout as a duration
    #[inline]
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Entry for `name`
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ModuleEntry> {
        self.specs.iter().find(|s| s.name == name)
    }
}

/// Page patching settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Page origin; URLs on it are never given `crossorigin`
    pub origin: Option<String>,
    /// Apply the blind brace balancer to inline scripts
    pub balance_inline_scripts: bool,
    /// Correct the casing of module script paths
    pub fix_script_paths: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            origin: None,
            balance_inline_scripts: false,
            fix_script_paths: true,
        }
    }
}

/// Error log settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorLogConfig {
    /// Keep at most this many records; unbounded when unset
    pub capacity: Option<usize>,
}

/// Static file server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,
    /// Directory holding the built dashboard
    pub static_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".into(),
            static_root: PathBuf::from("dist"),
        }
    }
}

/// Complete supervisor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    /// Error-triggered recovery
    pub recovery: RecoveryConfig,
    /// Scheduler and runtime
    pub scheduler: SchedulerConfig,
    /// Module resolution
    pub modules: ModulesConfig,
    /// Page patching
    pub patch: PatchConfig,
    /// Built-in watchdogs
    pub watchdogs: WatchdogSettings,
    /// Error log
    pub error_log: ErrorLogConfig,
    /// Static file server
    pub server: ServerConfig,
}

impl VigilConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With recovery settings
    #[inline]
    #[must_use]
    pub fn with_recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    /// With watchdog settings
    #[inline]
    #[must_use]
    pub fn with_watchdogs(mut self, watchdogs: WatchdogSettings) -> Self {
        self.watchdogs = watchdogs;
        self
    }

    /// With page origin
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.patch.origin = Some(origin.into());
        self
    }

    /// With error log capacity
    #[inline]
    #[must_use]
    pub fn with_error_log_capacity(mut self, capacity: usize) -> Self {
        self.error_log.capacity = Some(capacity);
        self
    }

    /// With module load timeout
    #[inline]
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.modules.load_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Parse from TOML text and validate
    ///
    /// # Errors
    /// Returns [`ConfigError`] on syntax errors or invalid values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Serialize to TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.recovery.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(invalid("recovery.keywords", "at least one non-empty keyword required"));
        }
        if self.recovery.default_view.trim().is_empty() {
            return Err(invalid("recovery.default_view", "must not be empty"));
        }
        if self.recovery.containers.is_empty() {
            return Err(invalid("recovery.containers", "at least one container required"));
        }
        if self.scheduler.tick_interval_ms == 0 {
            return Err(invalid("scheduler.tick_interval_ms", "must be positive"));
        }
        if self.scheduler.event_buffer == 0 {
            return Err(invalid("scheduler.event_buffer", "must be positive"));
        }
        if self.modules.load_timeout_ms == 0 {
            return Err(invalid("modules.load_timeout_ms", "must be positive"));
        }
        let mut seen = HashSet::new();
        for spec in &self.modules.specs {
            if spec.name.trim().is_empty() || spec.primary.trim().is_empty() {
                return Err(invalid("modules.specs", "name and primary path are required"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(invalid("modules.specs", &format!("duplicate module '{}'", spec.name)));
            }
        }
        if let Some(origin) = &self.patch.origin {
            url::Url::parse(origin).map_err(|e| invalid("patch.origin", &e.to_string()))?;
        }
        if self.watchdogs.stall_threshold_ms == 0 {
            return Err(invalid("watchdogs.stall_threshold_ms", "must be positive"));
        }
        if self.watchdogs.poll_interval_ms == 0 {
            return Err(invalid("watchdogs.poll_interval_ms", "must be positive"));
        }
        if self.watchdogs.loading_classes.is_empty() {
            return Err(invalid("watchdogs.loading_classes", "at least one class required"));
        }
        if self.error_log.capacity == Some(0) {
            return Err(invalid("error_log.capacity", "must be positive when set"));
        }
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|e| invalid("server.bind", &e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(VigilConfig::from_toml_str("").unwrap(), VigilConfig::default());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config = VigilConfig::from_toml_str(
            r#"
            [recovery]
            arm_delay_ms = 1500

            [patch]
            origin = "https://qrp.example"
            balance_inline_scripts = true
            "#,
        )
        .unwrap();
        assert_eq!(config.recovery.arm_delay(), Duration::from_millis(1500));
        assert_eq!(config.recovery.keywords, vec!["tab", "content"]);
        assert!(config.patch.balance_inline_scripts);
        assert_eq!(config.modules.specs.len(), 4);
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = VigilConfig::new().with_origin("https://qrp.example").with_error_log_capacity(50);
        let text = config.to_toml_string().unwrap();
        assert_eq!(VigilConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_bad_values() {
        for (text, field) in [
            ("[recovery]\nkeywords = []", "recovery.keywords"),
            ("[patch]\norigin = \"not a url\"", "patch.origin"),
            ("[server]\nbind = \"localhost\"", "server.bind"),
            ("[error_log]\ncapacity = 0", "error_log.capacity"),
            (
                "[[modules.specs]]\nname = \"ui\"\nprimary = \"a.js\"\n[[modules.specs]]\nname = \"ui\"\nprimary = \"b.js\"",
                "modules.specs",
            ),
        ] {
            match VigilConfig::from_toml_str(text) {
                Err(ConfigError::Invalid { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{field}: expected invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn entry_builds_loader_spec() {
        let config = VigilConfig::default();
        let spec = config.modules.entry("orgChart").unwrap().to_spec();
        assert_eq!(spec.paths().collect::<Vec<_>>(), vec!["js/orgChart.js", "js/orgchart.js", "js/org-chart.js"]);
    }
}
