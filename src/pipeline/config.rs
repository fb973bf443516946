//! Pipeline configuration.
//!
//! Everything here has a working default, so `PipelineConfig::default()` runs
//! the reference pipeline: two refinement passes at most, a 90 second budget
//! per step, and Critic thresholds of 0.7 (freeform) and 0.8 (template).

use std::time::Duration;

use thiserror::Error;

use crate::agents::critic::CriticConfig;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // LLM settings
    /// Model override applied to the LLM client. `None` keeps the client's default.
    pub default_model: Option<String>,
    /// Temperature for the Scriptwriter.
    pub script_temperature: f64,
    /// Temperature for the Art Director.
    pub art_temperature: f64,
    /// Temperature for the Director.
    pub director_temperature: f64,

    // Execution settings
    /// Upper bound on refinement passes after the first critique.
    pub max_refinements: u32,
    /// Budget for a single step before its fallback is used.
    pub step_timeout: Duration,

    // Quality settings
    /// Freeform runs scoring below this are refined.
    pub freeform_threshold: f64,
    /// Template runs scoring below this are refined.
    pub template_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_model: None,
            script_temperature: 0.8,
            art_temperature: 0.6,
            director_temperature: 0.7,

            max_refinements: 2,
            step_timeout: Duration::from_secs(90),

            freeform_threshold: 0.7,
            template_threshold: 0.8,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PIPELINE_DEFAULT_MODEL`: Model override (default: the client's model)
    /// - `PIPELINE_MAX_REFINEMENTS`: Refinement bound (default: 2)
    /// - `PIPELINE_STEP_TIMEOUT_SECS`: Per-step timeout in seconds (default: 90)
    /// - `PIPELINE_FREEFORM_THRESHOLD`: Freeform pass score (default: 0.7)
    /// - `PIPELINE_TEMPLATE_THRESHOLD`: Template pass score (default: 0.8)
    /// - `PIPELINE_SCRIPT_TEMPERATURE`: Scriptwriter temperature (default: 0.8)
    /// - `PIPELINE_ART_TEMPERATURE`: Art Director temperature (default: 0.6)
    /// - `PIPELINE_DIRECTOR_TEMPERATURE`: Director temperature (default: 0.7)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("PIPELINE_DEFAULT_MODEL") {
            let val = val.trim();
            if !val.is_empty() {
                config.default_model = Some(val.to_string());
            }
        }

        if let Some(val) = lookup("PIPELINE_SCRIPT_TEMPERATURE") {
            config.script_temperature = parse_env_value(&val, "PIPELINE_SCRIPT_TEMPERATURE")?;
        }

        if let Some(val) = lookup("PIPELINE_ART_TEMPERATURE") {
            config.art_temperature = parse_env_value(&val, "PIPELINE_ART_TEMPERATURE")?;
        }

        if let Some(val) = lookup("PIPELINE_DIRECTOR_TEMPERATURE") {
            config.director_temperature = parse_env_value(&val, "PIPELINE_DIRECTOR_TEMPERATURE")?;
        }

        if let Some(val) = lookup("PIPELINE_MAX_REFINEMENTS") {
            config.max_refinements = parse_env_value(&val, "PIPELINE_MAX_REFINEMENTS")?;
        }

        if let Some(val) = lookup("PIPELINE_STEP_TIMEOUT_SECS") {
            let secs: u64 = parse_env_value(&val, "PIPELINE_STEP_TIMEOUT_SECS")?;
            config.step_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup("PIPELINE_FREEFORM_THRESHOLD") {
            config.freeform_threshold = parse_env_value(&val, "PIPELINE_FREEFORM_THRESHOLD")?;
        }

        if let Some(val) = lookup("PIPELINE_TEMPLATE_THRESHOLD") {
            config.template_threshold = parse_env_value(&val, "PIPELINE_TEMPLATE_THRESHOLD")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` if any values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "step_timeout must be greater than 0".to_string(),
            ));
        }

        if self.max_refinements > 10 {
            return Err(ConfigError::ValidationFailed(
                "max_refinements must be at most 10".to_string(),
            ));
        }

        for (name, value) in [
            ("script_temperature", self.script_temperature),
            ("art_temperature", self.art_temperature),
            ("director_temperature", self.director_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be between 0.0 and 2.0",
                    name
                )));
            }
        }

        for (name, value) in [
            ("freeform_threshold", self.freeform_threshold),
            ("template_threshold", self.template_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be between 0.0 and 1.0",
                    name
                )));
            }
        }

        if let Some(model) = &self.default_model {
            if model.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "default_model cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Critic settings derived from the thresholds.
    pub fn critic_config(&self) -> CriticConfig {
        CriticConfig::default()
            .with_freeform_threshold(self.freeform_threshold)
            .with_template_threshold(self.template_threshold)
    }

    /// Builder method to set the model override.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Builder method to set the refinement bound.
    pub fn with_max_refinements(mut self, max: u32) -> Self {
        self.max_refinements = max;
        self
    }

    /// Builder method to set the per-step timeout.
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Builder method to set the freeform threshold.
    pub fn with_freeform_threshold(mut self, threshold: f64) -> Self {
        self.freeform_threshold = threshold;
        self
    }

    /// Builder method to set the template threshold.
    pub fn with_template_threshold(mut self, threshold: f64) -> Self {
        self.template_threshold = threshold;
        self
    }

    /// Builder method to set the Scriptwriter temperature.
    pub fn with_script_temperature(mut self, temp: f64) -> Self {
        self.script_temperature = temp;
        self
    }

    /// Builder method to set the Art Director temperature.
    pub fn with_art_temperature(mut self, temp: f64) -> Self {
        self.art_temperature = temp;
        self
    }

    /// Builder method to set the Director temperature.
    pub fn with_director_temperature(mut self, temp: f64) -> Self {
        self.director_temperature = temp;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
