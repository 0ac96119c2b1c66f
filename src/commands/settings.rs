use crate::autosave::config::{AutosaveConfig, BlankDocument};
use crate::autosave::AutosaveHandle;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tauri::Manager;

const SETTINGS_SCHEMA_VERSION: u32 = 1;
const SETTINGS_FILE: &str = "settings.json";

const INTERVAL_SECS: RangeInclusive<u64> = 30..=3600;
const DEBOUNCE_SECS: RangeInclusive<u64> = 1..=60;
const BRIDGE_TIMEOUT_SECS: RangeInclusive<u64> = 5..=600;
const CANVAS_PX: RangeInclusive<u64> = 16..=10_000;
const CANVAS_DPI: RangeInclusive<u64> = 36..=1200;

/// User settings as stored in `settings.json`. Always in range: anything read
/// from disk or sent by the webview goes through [`Settings::from_value`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "schema_version")]
    pub schema_version: u32,
    pub autosave_interval_secs: u64,
    pub activity_debounce_secs: u64,
    pub bridge_timeout_secs: u64,
    pub blank_document: BlankDocument,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let config = AutosaveConfig::default();
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            autosave_interval_secs: config.interval.as_secs(),
            activity_debounce_secs: config.activity_debounce.as_secs(),
            bridge_timeout_secs: config.bridge_timeout.as_secs(),
            blank_document: config.blank_document,
            notifications_enabled: config.notifications_enabled,
        }
    }
}

impl Settings {
    /// Reads whatever keys are present and usable; missing, mistyped or
    /// out-of-range values fall back to defaults or the nearest bound.
    pub fn from_value(raw: &Value) -> Self {
        let defaults = Self::default();
        let canvas = |key: &str, fallback: u32, range: RangeInclusive<u64>| {
            let value = raw.get("blankDocument").and_then(|blank| blank.get(key));
            within(value, range, u64::from(fallback)) as u32
        };

        Self {
            schema_version: SETTINGS_SCHEMA_VERSION,
            autosave_interval_secs: within(
                raw.get("autosaveIntervalSecs"),
                INTERVAL_SECS,
                defaults.autosave_interval_secs,
            ),
            activity_debounce_secs: within(
                raw.get("activityDebounceSecs"),
                DEBOUNCE_SECS,
                defaults.activity_debounce_secs,
            ),
            bridge_timeout_secs: within(
                raw.get("bridgeTimeoutSecs"),
                BRIDGE_TIMEOUT_SECS,
                defaults.bridge_timeout_secs,
            ),
            blank_document: BlankDocument {
                width: canvas("width", defaults.blank_document.width, CANVAS_PX),
                height: canvas("height", defaults.blank_document.height, CANVAS_PX),
                dpi: canvas("dpi", defaults.blank_document.dpi, CANVAS_DPI),
            },
            notifications_enabled: raw
                .get("notificationsEnabled")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.notifications_enabled),
        }
    }

    /// Applies a partial update from the webview. Keys it leaves out keep
    /// their current value, including single `blankDocument` fields.
    pub fn updated_with(&self, update: &Value) -> Self {
        let mut raw = self.to_value();
        if let (Some(current), Some(update)) = (raw.as_object_mut(), update.as_object()) {
            for (key, value) in update {
                match (current.get_mut(key), value) {
                    (Some(Value::Object(blank)), Value::Object(fields)) => {
                        blank.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    _ => {
                        current.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Self::from_value(&raw)
    }

    pub fn autosave_config(&self) -> AutosaveConfig {
        AutosaveConfig {
            interval: Duration::from_secs(self.autosave_interval_secs),
            activity_debounce: Duration::from_secs(self.activity_debounce_secs),
            bridge_timeout: Duration::from_secs(self.bridge_timeout_secs),
            blank_document: self.blank_document,
            notifications_enabled: self.notifications_enabled,
        }
    }

    fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn within(value: Option<&Value>, range: RangeInclusive<u64>, fallback: u64) -> u64 {
    value
        .and_then(Value::as_u64)
        .unwrap_or(fallback)
        .clamp(*range.start(), *range.end())
}

#[tauri::command]
pub async fn get_settings(app: tauri::AppHandle) -> Result<Settings, String> {
    load_settings(&config_dir(&app)?)
}

#[tauri::command]
pub async fn save_settings(
    settings: Value,
    app: tauri::AppHandle,
    autosave: tauri::State<'_, AutosaveHandle>,
) -> Result<Settings, String> {
    let saved = update_settings(&config_dir(&app)?, &settings)?;
    autosave.reconfigure(saved.autosave_config());
    Ok(saved)
}

pub fn config_dir(app: &tauri::AppHandle) -> Result<PathBuf, String> {
    app.path()
        .app_config_dir()
        .map_err(|e| format!("Could not resolve config directory: {e}"))
}

/// Settings as the autosave actor needs them. Unreadable files fall back to
/// defaults rather than blocking startup.
pub fn load_autosave_config(dir: &Path) -> AutosaveConfig {
    match load_settings(dir) {
        Ok(settings) => settings.autosave_config(),
        Err(e) => {
            log::warn!("Using default autosave settings: {}", e);
            AutosaveConfig::default()
        }
    }
}

/// Reads `settings.json`, writing it back when it is missing or needed
/// normalising.
pub fn load_settings(dir: &Path) -> Result<Settings, String> {
    let path = dir.join(SETTINGS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!("{} is not valid JSON, using defaults: {}", path.display(), e);
            Value::Null
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Null,
        Err(e) => return Err(format!("Failed to read {}: {e}", path.display())),
    };

    let settings = Settings::from_value(&raw);
    if settings.to_value() != raw {
        write_settings(dir, &settings)?;
    }
    Ok(settings)
}

pub fn update_settings(dir: &Path, update: &Value) -> Result<Settings, String> {
    let settings = load_settings(dir)?.updated_with(update);
    write_settings(dir, &settings)?;
    log::info!("Settings saved to {}", dir.join(SETTINGS_FILE).display());
    Ok(settings)
}

fn write_settings(dir: &Path, settings: &Settings) -> Result<(), String> {
    fs::create_dir_all(dir).map_err(|e| format!("Failed to create config directory: {e}"))?;
    let text = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {e}"))?;
    fs::write(dir.join(SETTINGS_FILE), text)
        .map_err(|e| format!("Failed to write settings.json: {e}"))
}
