//! Page supervisor
//!
//! Owns the page, the watchdog scheduler and the recovery handler, and turns
//! page events into detection cycles. All state lives here; nothing is kept
//! in globals.
//!
//! Page time (`now`) is supplied by the caller. [`crate::WatchdogRuntime`]
//! derives it from a Tokio clock; tests pass it directly.

use crate::config::{ModuleEntry, VigilConfig};
use crate::error::VigilError;
use crate::error_log::{ErrorLog, ErrorRecord};
use crate::events::{EventBus, VigilEvent};
use crate::settings::{self, AppSettings, SettingsSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use vigil_dom::ids::{MAIN_CONTENT, TAB_CONTENT};
use vigil_dom::{Document, ErrorEvent, Page, PageEvent, PagePhase};
use vigil_modules::{FallbackResolver, LoadOutcome, ModuleLoader, ModuleRegistry, ModuleSpec};
use vigil_patch::{
    balance_inline_scripts, check_inline_scripts, record_script_error, CorsNormalizer, CorsReport,
    ScriptPathNormalizer,
};
use vigil_recovery::{
    builtin_watchdogs, classify_error, show_toast, ContentReset, ErrorClass, ErrorTriggeredRecovery,
    HandleOutcome, PageState, RecoveryState, ResetReport, ToastLevel,
};
use vigil_recovery::watchdogs::tab_content_region;
use vigil_watchdog::{CycleReport, Outcome, RegionPath, Trigger, Watchdog, WatchdogId, WatchdogScheduler};

/// What the supervisor did about one uncaught error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAction {
    /// External tags were patched and the opaque error counted
    CorsPatched {
        /// Tags replaced
        report: CorsReport,
        /// Opaque errors counted so far
        script_errors: u64,
    },
    /// A stub was bound for the failed module and a reload started
    ModuleFallback {
        /// Binding name
        name: String,
        /// Whether the binding handed out is a stub
        stub: bool,
    },
    /// Inline scripts were checked (and balanced when enabled)
    InlineScripts {
        /// Unbalanced scripts found
        findings: usize,
        /// Scripts rewritten by the blind balancer
        balanced: usize,
    },
    /// Passed to the error-triggered recovery handler
    Recovery(HandleOutcome),
    /// Recovery skipped because a watchdog holds the reset region
    RegionBusy {
        /// Current lock holder
        holder: WatchdogId,
    },
    /// Logged only
    Logged,
}

/// Result of [`Supervisor::handle_error`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorHandled {
    /// Classification
    pub class: ErrorClass,
    /// Action taken
    pub action: ErrorAction,
    /// The `GlobalError` cycle that followed
    pub cycle: CycleReport,
}

/// Result of [`Supervisor::handle_event`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// A detection cycle ran
    Cycle(CycleReport),
    /// An error was handled
    Error(Box<ErrorHandled>),
}

impl EventOutcome {
    /// The cycle that ran for this event
    #[must_use]
    pub fn cycle(&self) -> &CycleReport {
        match self {
            Self::Cycle(cycle) => cycle,
            Self::Error(handled) => &handled.cycle,
        }
    }
}

/// Result of [`Supervisor::tick`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Mutation cycle, when the document changed since the last cycle
    pub mutation: Option<CycleReport>,
    /// Timer cycle
    pub timer: CycleReport,
    /// Background loads that finished since the last tick
    pub loaded: Vec<String>,
}

#[derive(Debug)]
struct PendingLoad {
    name: String,
    handle: JoinHandle<LoadOutcome>,
}

/// Self-healing supervisor for one page
pub struct Supervisor {
    config: VigilConfig,
    state: PageState,
    scheduler: WatchdogScheduler<PageState>,
    recovery: ErrorTriggeredRecovery,
    resolver: FallbackResolver,
    cors: CorsNormalizer,
    script_paths: ScriptPathNormalizer,
    content_reset: ContentReset,
    errors: ErrorLog,
    bus: EventBus,
    seen_revision: u64,
    loads: Vec<PendingLoad>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("phase", &self.state.phase)
            .field("mode", &self.state.mode)
            .field("recovery", &self.recovery.state())
            .field("watchdogs", &self.scheduler.len())
            .field("errors", &self.errors.len())
            .field("pending_loads", &self.loads.len())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Create supervisor with the built-in watchdogs registered
    ///
    /// The page origin from `config.patch.origin` wins over `page.origin`.
    ///
    /// # Errors
    /// Returns [`VigilError`] if the configuration is invalid or a built-in
    /// watchdog cannot be registered.
    pub fn new(config: VigilConfig, page: Page, loader: Arc<dyn ModuleLoader>) -> Result<Self, VigilError> {
        config.validate()?;

        let registry = Arc::new(ModuleRegistry::new());
        for (alias, target) in &config.modules.aliases {
            registry.alias(alias.clone(), target.clone());
        }
        let resolver =
            FallbackResolver::new(Arc::clone(&registry), loader).with_timeout(config.modules.load_timeout());

        let origin = config.patch.origin.clone().or_else(|| page.origin.clone());
        let cors = match &origin {
            Some(origin) => CorsNormalizer::new().with_origin(origin)?,
            None => CorsNormalizer::new(),
        };
        let script_paths = ScriptPathNormalizer::new(config.modules.specs.iter().map(|s| s.name.clone()));
        let content_reset = ContentReset::new(
            config.recovery.containers.iter().cloned(),
            config.recovery.default_view.clone(),
        );

        let bus = EventBus::default();
        let mut scheduler = WatchdogScheduler::with_sink(Arc::new(bus.clone()));
        for watchdog in builtin_watchdogs(&config.watchdogs) {
            scheduler.register(watchdog)?;
        }

        let errors = match config.error_log.capacity {
            Some(cap) => ErrorLog::bounded(cap),
            None => ErrorLog::new(),
        };
        let state = PageState::new(page, registry);
        let seen_revision = state.doc().revision();

        tracing::info!(watchdogs = scheduler.len(), origin = ?origin, "supervisor ready");
        Ok(Self {
            recovery: ErrorTriggeredRecovery::new(config.recovery.clone()),
            config,
            state,
            scheduler,
            resolver,
            cors,
            script_paths,
            content_reset,
            errors,
            bus,
            seen_revision,
            loads: Vec::new(),
        })
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &VigilConfig {
        &self.config
    }

    /// Page state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &PageState {
        &self.state
    }

    /// Mutable page state; changes are picked up as a mutation on the next tick
    #[inline]
    pub fn state_mut(&mut self) -> &mut PageState {
        &mut self.state
    }

    /// Document
    #[inline]
    #[must_use]
    pub fn doc(&self) -> &Document {
        self.state.doc()
    }

    /// Capability registry
    #[inline]
    #[must_use]
    pub fn modules(&self) -> &Arc<ModuleRegistry> {
        &self.state.modules
    }

    /// Scheduler
    #[inline]
    #[must_use]
    pub fn scheduler(&self) -> &WatchdogScheduler<PageState> {
        &self.scheduler
    }

    /// Recovery handler state
    #[inline]
    #[must_use]
    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery.state()
    }

    /// Completed error-triggered recoveries
    #[inline]
    #[must_use]
    pub fn recoveries(&self) -> u64 {
        self.recovery.recoveries()
    }

    /// Error log
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &ErrorLog {
        &self.errors
    }

    /// Event bus
    #[inline]
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Background loads not yet settled
    #[inline]
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    /// Register an additional watchdog
    ///
    /// # Errors
    /// Returns `WatchdogError::DuplicateName` if the name is taken.
    pub fn register(&mut self, watchdog: Box<dyn Watchdog<PageState>>) -> Result<WatchdogId, VigilError> {
        Ok(self.scheduler.register(watchdog)?)
    }

    /// Remove a watchdog; it is never evaluated again
    ///
    /// # Errors
    /// Returns `WatchdogError::NotFound` for unknown ids.
    pub fn unregister(&mut self, id: WatchdogId) -> Result<(), VigilError> {
        let removed = self.scheduler.unregister(id)?;
        tracing::info!(watchdog = %removed.spec().name, "watchdog unregistered");
        Ok(())
    }

    /// Re-enable a disabled watchdog
    ///
    /// # Errors
    /// Returns `WatchdogError::NotFound` for unknown ids.
    pub fn enable(&mut self, id: WatchdogId) -> Result<(), VigilError> {
        Ok(self.scheduler.enable(id)?)
    }

    /// Run one watchdog's repair now, by name
    ///
    /// # Errors
    /// Returns `WatchdogError::UnknownName` for unknown names and
    /// `WatchdogError::Disabled` for exhausted watchdogs.
    pub fn repair_now(&mut self, name: &str, now: Duration) -> Result<Outcome, VigilError> {
        let id = self
            .scheduler
            .id_of(name)
            .ok_or_else(|| vigil_watchdog::WatchdogError::UnknownName(name.to_string()))?;
        let outcome = self.scheduler.repair_now(id, now, &mut self.state)?;
        self.seen_revision = self.state.doc().revision();
        Ok(outcome)
    }

    /// Clear the content containers and recreate the default panel
    ///
    /// # Errors
    /// Returns `VigilError::Dom` if the document cannot be updated.
    pub fn reset_content(&mut self) -> Result<ResetReport, VigilError> {
        Ok(self.content_reset.reset(self.state.doc_mut())?)
    }

    /// Dispatch a page event at page time `now`
    ///
    /// Must be called within a Tokio runtime: module fallbacks spawn
    /// background loads.
    ///
    /// # Errors
    /// Returns [`VigilError`] only for failures the supervisor cannot absorb;
    /// repair failures are reported in the cycle instead.
    pub fn handle_event(&mut self, event: PageEvent, now: Duration) -> Result<EventOutcome, VigilError> {
        match event {
            PageEvent::DomContentLoaded => self.dom_content_loaded(now).map(EventOutcome::Cycle),
            PageEvent::Load => {
                self.state.phase = PagePhase::Complete;
                Ok(EventOutcome::Cycle(self.run_cycle(Trigger::WindowLoad, now)))
            }
            PageEvent::Mutation => Ok(EventOutcome::Cycle(self.run_cycle(Trigger::Mutation, now))),
            PageEvent::Error(error) => self
                .handle_error(&error, now)
                .map(|handled| EventOutcome::Error(Box::new(handled))),
        }
    }

    fn dom_content_loaded(&mut self, now: Duration) -> Result<CycleReport, VigilError> {
        if self.state.phase < PagePhase::Interactive {
            self.state.phase = PagePhase::Interactive;
        }
        if self.recovery.state() == RecoveryState::Uninitialized {
            self.recovery.start(now)?;
        }

        if self.config.patch.fix_script_paths {
            let rewrites = self.script_paths.normalize(self.state.doc_mut())?;
            for rewrite in &rewrites {
                tracing::info!(from = %rewrite.from, to = %rewrite.to, "script path corrected");
            }
        }

        let report = self.cors.normalize(self.state.doc_mut())?;
        if !report.is_empty() {
            let script_errors = vigil_patch::script_error_count(&self.state.page.storage);
            self.emit_cors_fixes(&report, script_errors);
        }

        self.check_inline_scripts()?;

        let specs: Vec<ModuleSpec> = self.config.modules.specs.iter().map(ModuleEntry::to_spec).collect();
        for spec in &specs {
            self.resolve_module(spec);
        }

        Ok(self.run_cycle(Trigger::DomReady, now))
    }

    /// Classify, log and act on an uncaught error
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// Returns [`VigilError`] if patching the document fails or the recovery
    /// handler hits an internal ordering bug.
    pub fn handle_error(&mut self, event: &ErrorEvent, now: Duration) -> Result<ErrorHandled, VigilError> {
        let class = classify_error(event);
        self.errors.push(ErrorRecord::new(event, class.clone(), now));
        tracing::warn!(message = %event.message, source = ?event.source, class = ?class, "uncaught error");

        let mut claimed = Vec::new();
        let action = match &class {
            ErrorClass::OpaqueCrossOrigin => {
                let script_errors = record_script_error(&mut self.state.page.storage);
                let report = self.cors.normalize(self.state.doc_mut())?;
                self.emit_cors_fixes(&report, script_errors);
                ErrorAction::CorsPatched { report, script_errors }
            }
            ErrorClass::LoadFailure { resource } => match resource.as_deref().and_then(|r| self.module_for(r)) {
                Some(spec) => {
                    let stub = self.resolve_module(&spec);
                    if stub {
                        self.notify(
                            ToastLevel::Warning,
                            &format!("{} failed to load; a limited version is shown while it retries", spec.name),
                        );
                    }
                    ErrorAction::ModuleFallback { name: spec.name, stub }
                }
                None => {
                    self.notify(ToastLevel::Error, "A resource failed to load. Some features may be unavailable.");
                    ErrorAction::Logged
                }
            },
            ErrorClass::MalformedInlineScript => {
                let (findings, balanced) = self.check_inline_scripts()?;
                ErrorAction::InlineScripts { findings, balanced }
            }
            ErrorClass::RuntimeError => {
                let region = reset_region(&self.config.recovery.containers);
                match self.scheduler.locks().try_acquire(&region, WatchdogId::EXTERNAL) {
                    Ok(guard) => {
                        let ui = self.state.modules.resolve("ui").binding.module;
                        let outcome = self.recovery.handle_error(event, now, self.state.doc_mut(), ui.as_ref())?;
                        drop(guard);
                        if !matches!(outcome, HandleOutcome::Ignored(_)) {
                            claimed.push(region);
                        }
                        self.after_recovery(event, &outcome);
                        ErrorAction::Recovery(outcome)
                    }
                    Err(holder) => {
                        tracing::info!(%region, %holder, "recovery skipped: region locked");
                        ErrorAction::RegionBusy { holder }
                    }
                }
            }
        };

        let cycle = self.run_cycle_after(Trigger::GlobalError, now, &claimed);
        Ok(ErrorHandled { class, action, cycle })
    }

    fn after_recovery(&mut self, event: &ErrorEvent, outcome: &HandleOutcome) {
        match outcome {
            HandleOutcome::Ignored(_) => return,
            HandleOutcome::Recovered { .. } => {}
            HandleOutcome::NavigationFailed { error, .. } => {
                self.notify(ToastLevel::Warning, &format!("Content was reset but navigation failed: {error}"));
            }
            HandleOutcome::ResetFailed { error } => {
                self.notify(ToastLevel::Error, &format!("Could not reset the page content: {error}"));
            }
        }
        self.bus.emit(VigilEvent::RecoveryTriggered {
            message: event.message.clone(),
            view: self.config.recovery.default_view.clone(),
            navigated: matches!(outcome, HandleOutcome::Recovered { .. }),
        });
    }

    /// Advance page time: arm the handler, settle loads, run mutation and
    /// timer cycles
    ///
    /// # Errors
    /// Propagates recovery handler transition errors.
    pub fn tick(&mut self, now: Duration) -> Result<TickReport, VigilError> {
        if self.recovery.state() != RecoveryState::Uninitialized {
            self.recovery.poll(now)?;
        }
        let loaded = self.settle_loads();

        let mutation = if self.state.doc().revision() == self.seen_revision {
            None
        } else {
            Some(self.run_cycle(Trigger::Mutation, now))
        };
        let timer = self.run_cycle(Trigger::Timer, now);
        Ok(TickReport { mutation, timer, loaded })
    }

    /// Wait for every background load and settle it
    pub async fn wait_for_loads(&mut self) -> Vec<(String, LoadOutcome)> {
        let (names, handles): (Vec<_>, Vec<_>) = std::mem::take(&mut self.loads)
            .into_iter()
            .map(|load| (load.name, load.handle))
            .unzip();
        let results = futures::future::join_all(handles).await;

        let mut outcomes = Vec::new();
        for (name, result) in names.into_iter().zip(results) {
            match result {
                Ok(outcome) => {
                    self.module_settled(&name);
                    outcomes.push((name, outcome));
                }
                Err(e) => tracing::error!(module = %name, error = %e, "module load task failed"),
            }
        }
        outcomes
    }

    fn settle_loads(&mut self) -> Vec<String> {
        let (done, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.loads).into_iter().partition(|l| l.handle.is_finished());
        self.loads = pending;
        done.into_iter()
            .map(|load| {
                self.module_settled(&load.name);
                load.name
            })
            .collect()
    }

    fn module_settled(&mut self, name: &str) {
        let real = self.state.modules.is_real(name);
        if real {
            if let Some(module) = self.state.modules.get(name) {
                if let Err(e) = module.init(self.state.doc_mut()) {
                    tracing::warn!(module = %name, error = %e, "module init failed");
                    self.notify(ToastLevel::Warning, &format!("{name} loaded but failed to start: {e}"));
                }
            }
        } else {
            self.notify(ToastLevel::Error, &format!("{name} could not be loaded; using a limited version"));
        }
        self.bus.emit(VigilEvent::ModuleLoaded {
            name: name.to_string(),
            real,
        });
    }

    /// Resolve a module; returns whether a stub was handed out
    fn resolve_module(&mut self, spec: &ModuleSpec) -> bool {
        if self.loads.iter().any(|l| l.name == spec.name) {
            return true;
        }
        let resolution = self.resolver.resolve(spec);
        let stub = resolution.is_stub();
        if let Some(handle) = resolution.pending {
            self.loads.push(PendingLoad {
                name: spec.name.clone(),
                handle,
            });
        }
        stub
    }

    /// Module spec whose paths or name match a failed resource URL
    fn module_for(&self, resource: &str) -> Option<ModuleSpec> {
        let path = resource.split(['?', '#']).next().unwrap_or(resource);
        let file = path.rsplit('/').next().unwrap_or(path);
        let stem = file.strip_suffix(".js").unwrap_or(file);

        let entries = &self.config.modules.specs;
        entries
            .iter()
            .find(|e| {
                std::iter::once(&e.primary)
                    .chain(&e.alternates)
                    .any(|p| p.rsplit('/').next().is_some_and(|f| f.eq_ignore_ascii_case(file)))
            })
            .or_else(|| {
                let canonical = self
                    .config
                    .modules
                    .aliases
                    .get(stem)
                    .map_or(stem, String::as_str);
                entries.iter().find(|e| e.name.eq_ignore_ascii_case(canonical))
            })
            .map(ModuleEntry::to_spec)
    }

    fn check_inline_scripts(&mut self) -> Result<(usize, usize), VigilError> {
        let findings = check_inline_scripts(self.state.doc()).len();
        let balanced = if findings > 0 && self.config.patch.balance_inline_scripts {
            balance_inline_scripts(self.state.doc_mut())?
        } else {
            0
        };
        if findings > 0 && balanced == 0 {
            self.notify(
                ToastLevel::Error,
                &format!("{findings} inline script(s) have unbalanced brackets"),
            );
        }
        Ok((findings, balanced))
    }

    /// Validate, persist and announce dashboard settings
    ///
    /// # Errors
    /// Returns `VigilError::Settings` if validation or the write fails.
    pub fn save_settings(&mut self, settings: &AppSettings) -> Result<(), VigilError> {
        settings::save_settings(&mut self.state.page.storage, settings)?;
        self.bus.emit(VigilEvent::ConfigUpdated(settings.clone()));
        Ok(())
    }

    /// Load dashboard settings, restoring defaults when the stored value is bad
    ///
    /// # Errors
    /// Returns `VigilError::Settings` if the defaults cannot be written back.
    pub fn load_settings(&mut self) -> Result<AppSettings, VigilError> {
        let (settings, source) = settings::load_settings(&mut self.state.page.storage)?;
        if source == SettingsSource::Repaired {
            self.notify(ToastLevel::Warning, "Saved settings were invalid and have been reset");
            self.bus.emit(VigilEvent::ConfigUpdated(settings.clone()));
        }
        Ok(settings)
    }

    /// Show a toast; failures are logged, never raised
    pub fn notify(&mut self, level: ToastLevel, message: &str) -> Option<String> {
        match show_toast(self.state.doc_mut(), level, message) {
            Ok(id) => {
                self.bus.emit(VigilEvent::Toast {
                    id: id.clone(),
                    level,
                    message: message.to_string(),
                });
                Some(id)
            }
            Err(e) => {
                tracing::error!(error = %e, message, "toast could not be shown");
                None
            }
        }
    }

    fn emit_cors_fixes(&self, report: &CorsReport, script_errors: u64) {
        self.bus.emit(VigilEvent::CorsFixes {
            urls: report.urls().map(str::to_string).collect(),
            script_errors,
        });
    }

    fn run_cycle(&mut self, trigger: Trigger, now: Duration) -> CycleReport {
        self.run_cycle_after(trigger, now, &[])
    }

    fn run_cycle_after(&mut self, trigger: Trigger, now: Duration, claimed: &[RegionPath]) -> CycleReport {
        let report = self.scheduler.run_cycle_after(trigger, now, &mut self.state, claimed);
        for entry in &report.entries {
            if let Outcome::Disabled { error } = &entry.outcome {
                self.notify(
                    ToastLevel::Warning,
                    &format!("Automatic repair '{}' stopped: {error}", entry.name),
                );
            }
        }
        self.seen_revision = self.state.doc().revision();
        report
    }

    /// Stop background loads and unregister every watchdog
    pub fn teardown(&mut self) {
        for load in self.loads.drain(..) {
            load.handle.abort();
        }
        self.scheduler.clear();
        tracing::info!(errors = self.errors.len(), recoveries = self.recovery.recoveries(), "supervisor stopped");
    }
}

/// Region written by the error-triggered content reset
fn reset_region(containers: &[String]) -> RegionPath {
    if containers.iter().all(|c| c == TAB_CONTENT) {
        tab_content_region()
    } else if containers.iter().all(|c| c == TAB_CONTENT || c == MAIN_CONTENT) {
        RegionPath::body().child(MAIN_CONTENT).unwrap_or_else(|_| RegionPath::body())
    } else {
        RegionPath::body()
    }
}
