use std::path::PathBuf;
use std::time::Duration;

use ::config::{Config, ConfigError, File};
use serde::Deserialize;

/// Base name of the optional settings file (`Catfetch.toml`).
pub const CONFIG_FILE: &str = "Catfetch";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    /// Metadata request timeout, in seconds.
    pub request_timeout: u64,
    /// Tag list request timeout, in seconds.
    pub tags_timeout: u64,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("cats.db"),
            request_timeout: 30,
            tags_timeout: 30,
            window_title: "CatFetch".to_string(),
            window_width: 400,
            window_height: 500,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    /// Layers the file `name` (any extension the `config` crate knows) over
    /// the defaults. A missing file is not an error.
    pub fn load_from(name: &str) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Config::builder()
            .set_default("db_path", defaults.db_path.to_string_lossy().into_owned())?
            .set_default("request_timeout", defaults.request_timeout as i64)?
            .set_default("tags_timeout", defaults.tags_timeout as i64)?
            .set_default("window_title", defaults.window_title)?
            .set_default("window_width", defaults.window_width as i64)?
            .set_default("window_height", defaults.window_height as i64)?
            .add_source(File::with_name(name).required(false))
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn tags_timeout(&self) -> Duration {
        Duration::from_secs(self.tags_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("Absent");

        let config = AppConfig::load_from(name.to_str().unwrap()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.tags_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn file_overrides_some_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Catfetch.toml"),
            "db_path = \"/tmp/other.db\"\nrequest_timeout = 5\nwindow_title = \"Cats!\"\n",
        )
        .unwrap();

        let name = dir.path().join("Catfetch");
        let config = AppConfig::load_from(name.to_str().unwrap()).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.window_title, "Cats!");
        assert_eq!(config.tags_timeout, 30);
        assert_eq!(config.window_width, 400);
        assert_eq!(config.window_height, 500);
    }

    #[test]
    fn malformed_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Bad.toml"), "window_width = \"wide\"\n").unwrap();

        let name = dir.path().join("Bad");
        assert!(AppConfig::load_from(name.to_str().unwrap()).is_err());
    }
}
