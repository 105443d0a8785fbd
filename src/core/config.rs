use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::alerts::state::DEFAULT_HYSTERESIS_MARGIN_KM;
use super::error::PersistenceError;

pub const DEFAULT_ALERT_RADIUS_KM: f64 = 50.0;

/// Operator settings, persisted as `settings.json`.
///
/// Missing keys take their defaults. The legacy `missileAlerts` and
/// `autoFocus` keys are still accepted on load.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Geofence radius in km
    pub alert_radius: f64,
    #[serde(alias = "missileAlerts")]
    pub alerts_enabled: bool,
    #[serde(alias = "autoFocus")]
    pub auto_focus_enabled: bool,
    pub hysteresis_margin_km: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            alert_radius: DEFAULT_ALERT_RADIUS_KM,
            alerts_enabled: true,
            auto_focus_enabled: false,
            hysteresis_margin_km: DEFAULT_HYSTERESIS_MARGIN_KM,
        }
    }
}

impl Settings {
    /// Replaces out-of-range values with their defaults.
    pub fn normalized(mut self) -> Self {
        self.alert_radius = sanitize_radius(self.alert_radius);
        if !self.hysteresis_margin_km.is_finite() || self.hysteresis_margin_km < 0.0 {
            self.hysteresis_margin_km = DEFAULT_HYSTERESIS_MARGIN_KM;
        }
        self
    }
}

fn sanitize_radius(km: f64) -> f64 {
    if km.is_finite() && km > 0.0 {
        km
    } else {
        DEFAULT_ALERT_RADIUS_KM
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reads the settings file. `Ok(None)` when nothing was saved yet.
    pub fn try_load(&self) -> Result<Option<Settings>, PersistenceError> {
        if !self.config_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.config_path).map_err(|source| PersistenceError::Io {
            path: self.config_path.clone(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(Some(settings.normalized()))
    }

    /// Like [`Self::try_load`], but any failure yields the defaults.
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {e}");
                Settings::default()
            }
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError::Io {
            path: self.config_path.clone(),
            source,
        };
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content).map_err(io_err)
    }
}

/// Settings plus their backing file. Every setter persists immediately.
pub struct SettingsStore {
    settings: Settings,
    manager: ConfigManager,
}

impl SettingsStore {
    /// Loads once from `manager`, falling back to defaults.
    pub fn open(manager: ConfigManager) -> Self {
        let settings = manager.load();
        Self { settings, manager }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Sets the radius (invalid values become the default) and returns the
    /// effective value, or `None` if nothing changed.
    pub fn set_alert_radius(&mut self, km: f64) -> Option<f64> {
        let km = sanitize_radius(km);
        if (km - self.settings.alert_radius).abs() < f64::EPSILON {
            return None;
        }
        self.settings.alert_radius = km;
        self.persist();
        Some(km)
    }

    pub fn set_alerts_enabled(&mut self, enabled: bool) {
        self.settings.alerts_enabled = enabled;
        self.persist();
    }

    pub fn set_auto_focus_enabled(&mut self, enabled: bool) {
        self.settings.auto_focus_enabled = enabled;
        self.persist();
    }

    // A failed write is only logged; the next mutation writes the full state again.
    fn persist(&self) {
        if let Err(e) = self.manager.save(&self.settings) {
            log::warn!("Failed to save settings to {:?}: {e}", self.manager.path());
        }
    }
}
