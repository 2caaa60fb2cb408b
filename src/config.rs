use crate::error::AppError;
use crate::pipeline::narration::RetryPolicy;
use crate::store::{ReadPolicy, ResultStore};
use config::{Environment, File, FileFormat, Source};
use serde::Deserialize;
use std::time::Duration;

/// Optional configuration file, looked up as `animal-lens.toml` in the working directory.
pub const CONFIG_FILE: &str = "animal-lens";
pub const ENV_PREFIX: &str = "ANIMAL_LENS";
/// Narrative credential honoured when the prefixed key is absent.
pub const CREDENTIAL_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_NARRATIVE_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log_level: String,
    pub server: ServerSettings,
    pub pipeline: PipelineSettings,
    pub narrative: NarrativeSettings,
    pub store: StoreSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerSettings::default(),
            pipeline: PipelineSettings::default(),
            narrative: NarrativeSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub confidence_threshold: f32,
    pub min_dimension: u32,
    pub device_concurrency: usize,
    pub segmentation_tolerance: f32,
    pub classifier_temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            min_dimension: 64,
            device_concurrency: 1,
            segmentation_tolerance: 48.0,
            classifier_temperature: 12.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NarrativeSettings {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub attempt_timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
}

impl Default for NarrativeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_NARRATIVE_ENDPOINT.to_string(),
            attempt_timeout_secs: 10,
            max_retries: 3,
            initial_backoff_ms: 500,
        }
    }
}

impl NarrativeSettings {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.max_retries,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub read_policy: ReadPolicy,
    pub sweep_on_store: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 1800,
            sweep_interval_secs: 60,
            read_policy: ReadPolicy::default(),
            sweep_on_store: true,
        }
    }
}

impl StoreSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Configuration {
    /// Defaults, then `animal-lens.toml` if present, then `ANIMAL_LENS__*` variables.
    pub fn load() -> Result<Self, AppError> {
        Self::from_sources(
            File::with_name(CONFIG_FILE).required(false),
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
            std::env::var(CREDENTIAL_VAR).ok(),
        )
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let configuration: Self = config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        configuration.validate().map_err(AppError::Config)?;
        Ok(configuration)
    }

    fn from_sources<F>(
        file: F,
        environment: Environment,
        fallback_api_key: Option<String>,
    ) -> Result<Self, AppError>
    where
        F: Source + Send + Sync + 'static,
    {
        let mut configuration: Self = config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        if configuration.narrative.api_key.is_none() {
            configuration.narrative.api_key = fallback_api_key.filter(|key| !key.is_empty());
        }

        configuration.validate().map_err(AppError::Config)?;
        Ok(configuration)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.pipeline.confidence_threshold) {
            return Err("Confidence threshold must be between 0.0 and 1.0".to_string());
        }

        if self.pipeline.min_dimension == 0 {
            return Err("Minimum image dimension must be greater than 0".to_string());
        }

        if self.pipeline.device_concurrency == 0 {
            return Err("Device concurrency must be greater than 0".to_string());
        }

        if self.pipeline.classifier_temperature <= 0.0 {
            return Err("Classifier temperature must be greater than 0".to_string());
        }

        if self.narrative.attempt_timeout_secs == 0 {
            return Err("Narration attempt timeout must be greater than 0".to_string());
        }

        if self.store.ttl_secs == 0 {
            return Err("Result TTL must be greater than 0".to_string());
        }

        if self.store.ttl() > ResultStore::MAX_TTL {
            return Err(format!(
                "Result TTL must not exceed {} seconds",
                ResultStore::MAX_TTL.as_secs()
            ));
        }

        if self.store.sweep_interval_secs == 0 {
            return Err("Sweep interval must be greater than 0".to_string());
        }

        Ok(())
    }
}
