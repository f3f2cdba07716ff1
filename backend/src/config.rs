use crate::inference::classifier::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidOverride { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub report: ReportConfig,
    pub session: SessionConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Where the uploaded image is staged while the PDF is assembled.
    pub scratch_dir: Option<PathBuf>,
    pub image_width_mm: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let frontend_dir = if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            format!("{}/../frontend/dist", manifest_dir)
        } else {
            "/usr/src/app/frontend/dist".to_string()
        };

        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            frontend_dir,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/mammogram_classifier.pt"),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            image_width_mm: 100.0,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 50 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Reads `MAMMOSCAN_CONFIG` or `config/mammoscan.yaml`, then applies the
    /// `PORT` and `MODEL_PATH` environment overrides. A missing file is not an
    /// error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var("MAMMOSCAN_CONFIG").unwrap_or_else(|_| "config/mammoscan.yaml".into());
        let mut config = if Path::new(&path).exists() {
            log::info!("Loading configuration from {}", path);
            Self::from_file(&path)?
        } else {
            log::info!("No configuration file at {}, using defaults", path);
            Self::default()
        };

        config.apply_overrides(env::var("PORT").ok(), env::var("MODEL_PATH").ok())?;
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(config_str)?)
    }

    fn apply_overrides(
        &mut self,
        port: Option<String>,
        model_path: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = port {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { key: "PORT", value: port })?;
        }
        if let Some(model_path) = model_path {
            self.model.path = PathBuf::from(model_path);
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.report
            .scratch_dir
            .clone()
            .unwrap_or_else(env::temp_dir)
    }
}
