use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProducerConfig {
    #[serde(default = "defaults::shm_file_path")]
    pub shm_file_path: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::fps")]
    pub fps: u32,
    /// Encoded frame to publish instead of the built-in placeholder.
    #[serde(default)]
    pub mock_frame_path: Option<String>,
    /// Dimensions reported for the frame at `mock_frame_path`.
    #[serde(default = "defaults::mock_frame_width")]
    pub mock_frame_width: u32,
    #[serde(default = "defaults::mock_frame_height")]
    pub mock_frame_height: u32,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    #[serde(default = "defaults::shm_file_path")]
    pub shm_file_path: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "defaults::read_retries")]
    pub read_retries: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn shm_file_path() -> String {
        "/dev/shm/pulsescope_shm".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn fps() -> u32 {
        30
    }

    pub fn mock_frame_width() -> u32 {
        2000
    }

    pub fn mock_frame_height() -> u32 {
        1129
    }

    pub fn poll_interval_ms() -> u64 {
        10
    }

    pub fn read_retries() -> u32 {
        8
    }
}

fn load<T: DeserializeOwned>(path: impl AsRef<Path> + ToString) -> Result<T, ConfigError> {
    let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;
    Ok(toml::from_str(&toml_to_str)?)
}

impl ProducerConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        load(path)
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        load(path)
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            shm_file_path: defaults::shm_file_path(),
            log_level: defaults::log_level(),
            fps: defaults::fps(),
            mock_frame_path: None,
            mock_frame_width: defaults::mock_frame_width(),
            mock_frame_height: defaults::mock_frame_height(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            shm_file_path: defaults::shm_file_path(),
            log_level: defaults::log_level(),
            poll_interval_ms: defaults::poll_interval_ms(),
            read_retries: defaults::read_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let producer: ProducerConfig = toml::from_str("").unwrap();
        assert_eq!(producer, ProducerConfig::default());

        let monitor: MonitorConfig = toml::from_str("").unwrap();
        assert_eq!(monitor, MonitorConfig::default());
        assert_eq!(monitor.shm_file_path, "/dev/shm/pulsescope_shm");
        assert_eq!((producer.mock_frame_width, producer.mock_frame_height), (2000, 1129));
    }

    #[test]
    fn fields_override_defaults() {
        let producer: ProducerConfig = toml::from_str(
            r#"
            shm_file_path = "/tmp/ps"
            fps = 60
            mock_frame_path = "frame.jpg"
            mock_frame_width = 1280
            mock_frame_height = 720
            "#,
        )
        .unwrap();
        assert_eq!(producer.shm_file_path, "/tmp/ps");
        assert_eq!(producer.fps, 60);
        assert_eq!(producer.mock_frame_path.as_deref(), Some("frame.jpg"));
        assert_eq!((producer.mock_frame_width, producer.mock_frame_height), (1280, 720));
        assert_eq!(producer.log_level, "info");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = MonitorConfig::load("/nonexistent/pulsescope.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let path = std::env::temp_dir().join(format!("pulsescope_cfg_{}.toml", std::process::id()));
        std::fs::write(&path, "read_retries = \"many\"").unwrap();
        let err = MonitorConfig::load(path.to_string_lossy().into_owned()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        let _ = std::fs::remove_file(&path);
    }
}
