use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_output_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl Settings {
    /// Loads settings from the user config directory. Anything that goes
    /// wrong falls back to defaults with a warning; a broken settings file
    /// should never keep the window from opening.
    pub fn load() -> Self {
        let Some(path) = settings_path() else {
            warn!("could not determine the user config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Self {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read settings");
                return Self::default();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse settings");
                Self::default()
            }
        }
    }

    pub fn save(&self) -> io::Result<()> {
        let path = settings_path().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no user config directory")
        })?;
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> io::Result<()> {
        let dir = path.parent().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "settings path has no parent")
        })?;
        fs::create_dir_all(dir)?;

        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;

        // Write to a sibling temp file first so a crash mid-write can't leave
        // a truncated settings file behind.
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, bytes)?;
        match fs::rename(&tmp_path, path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                // Windows refuses to rename over an existing file.
                if path.exists() {
                    fs::remove_file(path)?;
                    fs::rename(&tmp_path, path)?;
                    Ok(())
                } else {
                    Err(rename_err)
                }
            }
        }
    }

    /// Stores the key as edited in the settings window; blank means unset.
    pub fn set_api_key(&mut self, raw: &str) {
        let key = raw.trim();
        self.api_key = if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        };
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gemchat").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "gemchat_settings_{prefix}_{}_{}.json",
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load_from(&temp_path("missing"));
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn save_then_load_round_trips() {
        let path = temp_path("round_trip");
        let settings = Settings {
            api_key: Some("secret".into()),
            model: "gemini-2.0-pro".into(),
            max_output_tokens: 2048,
        };
        settings.save_to(&path).expect("settings should save");

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.api_key.as_deref(), Some("secret"));
        assert_eq!(loaded.model, "gemini-2.0-pro");
        assert_eq!(loaded.max_output_tokens, 2048);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "api_key": "k" }"#).expect("fixture should write");

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.api_key.as_deref(), Some("k"));
        assert_eq!(loaded.model, DEFAULT_MODEL);
        assert_eq!(loaded.max_output_tokens, 1024);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn unparseable_file_yields_defaults() {
        let path = temp_path("garbage");
        fs::write(&path, "not json").expect("fixture should write");

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded.api_key, None);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn set_api_key_treats_blank_as_unset() {
        let mut settings = Settings::default();
        settings.set_api_key("  my-key  ");
        assert_eq!(settings.api_key.as_deref(), Some("my-key"));

        settings.set_api_key("   ");
        assert_eq!(settings.api_key, None);
    }
}
