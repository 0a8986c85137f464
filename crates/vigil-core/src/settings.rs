//! Dashboard settings persisted in local storage
//!
//! The settings object is validated before every write. A stored value
//! that no longer parses or validates is replaced by the defaults on load
//! rather than breaking the page.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use vigil_dom::LocalStorage;

/// Storage key of the settings object
pub const SETTINGS_KEY: &str = "qrp.settings";

/// Views a user may pick as the start tab
pub const KNOWN_VIEWS: &[&str] = &["dashboard", "orgChart", "raciMatrix", "config"];

/// Colour scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light
    #[default]
    Light,
    /// Dark
    Dark,
    /// Follow the system
    System,
}

/// User-editable dashboard settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    /// Organisation shown in the header
    pub organization: String,
    /// Tab opened on load
    pub default_tab: String,
    /// Data refresh period in seconds
    pub refresh_interval_secs: u32,
    /// Base of the dashboard API; absolute URL or path starting with `/`
    pub api_base_url: String,
    /// Colour scheme
    pub theme: Theme,
    /// Show help tooltips
    pub show_tooltips: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            organization: "Quality".into(),
            default_tab: "dashboard".into(),
            refresh_interval_secs: 60,
            api_base_url: "/api".into(),
            theme: Theme::Light,
            show_tooltips: true,
        }
    }
}

impl AppSettings {
    /// Check every field
    ///
    /// # Errors
    /// Returns `SettingsError::Invalid` naming the first bad field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |field: &str, reason: String| SettingsError::Invalid {
            field: field.to_string(),
            reason,
        };

        if self.organization.trim().is_empty() {
            return Err(invalid("organization", "must not be empty".into()));
        }
        if !KNOWN_VIEWS.contains(&self.default_tab.as_str()) {
            return Err(invalid(
                "defaultTab",
                format!("'{}' is not one of {}", self.default_tab, KNOWN_VIEWS.join(", ")),
            ));
        }
        if !(5..=3600).contains(&self.refresh_interval_secs) {
            return Err(invalid("refreshIntervalSecs", "must be between 5 and 3600".into()));
        }
        if !self.api_base_url.starts_with('/') {
            url::Url::parse(&self.api_base_url).map_err(|e| invalid("apiBaseUrl", e.to_string()))?;
        }
        Ok(())
    }
}

/// Where [`load_settings`] got its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    /// Valid stored object
    Stored,
    /// Nothing stored
    Defaults,
    /// Stored object was unreadable or invalid and has been replaced
    Repaired,
}

/// Load settings, falling back to (and persisting) defaults
///
/// # Errors
/// Returns `SettingsError::Storage` only if writing the defaults back fails.
pub fn load_settings(storage: &mut LocalStorage) -> Result<(AppSettings, SettingsSource), SettingsError> {
    match storage.get_json::<AppSettings>(SETTINGS_KEY) {
        Ok(Some(settings)) => match settings.validate() {
            Ok(()) => Ok((settings, SettingsSource::Stored)),
            Err(e) => {
                tracing::warn!(error = %e, "stored settings invalid, restoring defaults");
                let defaults = AppSettings::default();
                storage.set_json(SETTINGS_KEY, &defaults)?;
                Ok((defaults, SettingsSource::Repaired))
            }
        },
        Ok(None) => Ok((AppSettings::default(), SettingsSource::Defaults)),
        Err(e) => {
            tracing::warn!(error = %e, "stored settings unreadable, restoring defaults");
            let defaults = AppSettings::default();
            storage.set_json(SETTINGS_KEY, &defaults)?;
            Ok((defaults, SettingsSource::Repaired))
        }
    }
}

/// Validate and persist settings
///
/// # Errors
/// Returns [`SettingsError`] if validation or the write fails; nothing is
/// written in that case.
pub fn save_settings(storage: &mut LocalStorage, settings: &AppSettings) -> Result<(), SettingsError> {
    settings.validate()?;
    storage.set_json(SETTINGS_KEY, settings)?;
    tracing::info!(default_tab = %settings.default_tab, "settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_storage_gives_defaults_without_writing() {
        let mut storage = LocalStorage::new();
        let (settings, source) = load_settings(&mut storage).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(source, SettingsSource::Defaults);
        assert!(storage.get_item(SETTINGS_KEY).is_none());
    }

    #[test]
    fn save_then_load() {
        let mut storage = LocalStorage::new();
        let settings = AppSettings {
            default_tab: "orgChart".into(),
            theme: Theme::Dark,
            ..AppSettings::default()
        };
        save_settings(&mut storage, &settings).unwrap();
        assert!(storage.get_item(SETTINGS_KEY).unwrap().contains("\"defaultTab\":\"orgChart\""));
        assert_eq!(load_settings(&mut storage).unwrap(), (settings, SettingsSource::Stored));
    }

    #[test]
    fn invalid_settings_are_not_written() {
        let mut storage = LocalStorage::new();
        let settings = AppSettings {
            refresh_interval_secs: 1,
            ..AppSettings::default()
        };
        assert!(matches!(
            save_settings(&mut storage, &settings),
            Err(SettingsError::Invalid { field, .. }) if field == "refreshIntervalSecs"
        ));
        assert!(storage.is_empty());
    }

    #[test]
    fn corrupt_value_is_repaired() {
        let mut storage = LocalStorage::new();
        storage.set_item(SETTINGS_KEY, "{not json");
        let (settings, source) = load_settings(&mut storage).unwrap();
        assert_eq!(source, SettingsSource::Repaired);
        assert_eq!(settings, AppSettings::default());
        assert!(storage.get_json::<AppSettings>(SETTINGS_KEY).unwrap().is_some());

        storage.set_item(SETTINGS_KEY, r#"{"defaultTab":"nowhere"}"#);
        assert_eq!(load_settings(&mut storage).unwrap().1, SettingsSource::Repaired);
    }
}
