//! Vigil Core - page self-healing supervisor
//!
//! Wires the page model, the watchdog scheduler, module fallback, page
//! patches and error-triggered recovery into one [`Supervisor`], and drives
//! it on Tokio with [`WatchdogRuntime`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil_core::prelude::*;
//!
//! # async fn example() -> Result<(), VigilError> {
//! let config = VigilConfig::load("vigil.toml")?;
//! let supervisor = Supervisor::new(config, Page::new(), Arc::new(ManifestLoader::new()))?;
//!
//! let runtime = WatchdogRuntime::spawn(supervisor);
//! runtime.send(PageEvent::DomContentLoaded).await?;
//! runtime.send(PageEvent::Load).await?;
//!
//! let supervisor = runtime.shutdown().await?;
//! println!("{} errors logged", supervisor.errors().len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod error_log;
pub mod events;
pub mod http;
pub mod runtime;
pub mod settings;
pub mod supervisor;

pub use config::{
    ErrorLogConfig, ModuleEntry, ModulesConfig, PatchConfig, SchedulerConfig, ServerConfig, VigilConfig,
};
pub use error::{ConfigError, HttpError, SettingsError, VigilError};
pub use error_log::{ErrorLog, ErrorRecord};
pub use events::{EventBus, VigilEvent};
pub use http::{ApiClient, HealthStatus, HEALTH_PATH};
pub use runtime::{RuntimeHandle, WatchdogRuntime};
pub use settings::{load_settings, save_settings, AppSettings, SettingsSource, Theme, SETTINGS_KEY};
pub use supervisor::{ErrorAction, ErrorHandled, EventOutcome, Supervisor, TickReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the supervisor
    pub use crate::{
        AppSettings, EventBus, RuntimeHandle, Supervisor, VigilConfig, VigilError, VigilEvent,
        WatchdogRuntime,
    };
    pub use vigil_dom::{ErrorEvent, Page, PageEvent};
    pub use vigil_modules::{Capability, ManifestLoader, ModuleLoader};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
