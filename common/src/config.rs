use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub compositor: CompositorConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositorConfig {
    #[serde(default = "default_tile_width")]
    pub tile_width: u32,
    #[serde(default = "default_tile_height")]
    pub tile_height: u32,
    /// Compositor cadence in cycles per second, independent of producer rate.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// The grid never grows wider than this; extra feeds wrap to new rows.
    #[serde(default = "default_max_columns")]
    pub max_columns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewerConfig {
    /// Run without a window; composites are still produced and counted.
    #[serde(default)]
    pub headless: bool,
    #[serde(default = "default_title")]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            tile_width: default_tile_width(),
            tile_height: default_tile_height(),
            fps: default_fps(),
            max_columns: default_max_columns(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            headless: false,
            title: default_title(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file. A missing file is not an error:
    /// the viewer must be runnable with zero setup, so built-in defaults
    /// apply. A file that exists but does not parse is still fatal.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::ReadFile(path.display().to_string(), e)),
        };
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    3000
}
fn default_tile_width() -> u32 {
    320
}
fn default_tile_height() -> u32 {
    240
}
fn default_fps() -> f64 {
    10.0
}
fn default_max_columns() -> u32 {
    2
}
fn default_title() -> String {
    "Multi-Client Camera Feeds".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.compositor.tile_width, 320);
        assert_eq!(config.compositor.tile_height, 240);
        assert_eq!(config.compositor.fps, 10.0);
        assert_eq!(config.compositor.max_columns, 2);
        assert!(!config.viewer.headless);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_toml_overrides_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [compositor]
            max_columns = 3

            [viewer]
            headless = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.compositor.max_columns, 3);
        assert_eq!(config.compositor.tile_width, 320);
        assert!(config.viewer.headless);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("/nonexistent/cam-grid.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
    }
}
