use crate::config::Config;
use crate::error::{Result, SiftError, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_knowledge(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_evaluation(config, &mut errors);
        Self::validate_llm(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_tools(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SiftError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_knowledge(config: &Config, errors: &mut Vec<ValidationError>) {
        // Note: directory existence is not checked here; a missing knowledge
        // directory is handled at scan time and the store file is created
        // on first save.
        if config.knowledge.dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "knowledge.dir",
                "Knowledge directory path cannot be empty",
            ));
        }

        if config.knowledge.store_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "knowledge.store_path",
                "Store path cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.retrieval.top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.top_k",
                "top_k must be greater than 0",
            ));
        }

        if config.retrieval.report_top_k == 0 {
            errors.push(ValidationError::new(
                "retrieval.report_top_k",
                "report_top_k must be greater than 0",
            ));
        }
    }

    fn validate_evaluation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.evaluation.inner_timeout_secs == 0 {
            errors.push(ValidationError::new(
                "evaluation.inner_timeout_secs",
                "Inner timeout must be greater than 0",
            ));
        }

        // The outer bound covers worker startup and result delivery on top
        // of the scorer call itself
        if config.evaluation.outer_timeout_secs <= config.evaluation.inner_timeout_secs {
            errors.push(ValidationError::new(
                "evaluation.outer_timeout_secs",
                format!(
                    "Outer timeout ({}) must exceed inner timeout ({})",
                    config.evaluation.outer_timeout_secs, config.evaluation.inner_timeout_secs
                ),
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        // If the LLM is enabled, an API key must be reachable through the
        // configured variable or the OPENAI_API_KEY fallback
        if config.llm.enabled {
            let env_var = &config.llm.api_key_env;
            let configured = Self::env_var_set(env_var) || Self::env_var_set("OPENAI_API_KEY");
            if !configured {
                errors.push(ValidationError::new(
                    "llm.api_key_env",
                    format!("Environment variable {} is not set", env_var),
                ));
            }
        }

        let temp = config.llm.temperature;
        if !(0.0..=2.0).contains(&temp) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be between 0.0 and 2.0, got {}", temp),
            ));
        }

        if config.llm.base_url.is_empty() {
            errors.push(ValidationError::new(
                "llm.base_url",
                "Base URL cannot be empty",
            ));
        }

        if config.llm.model.is_empty() {
            errors.push(ValidationError::new("llm.model", "Model cannot be empty"));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "Vector dimension must be greater than 0",
            ));
        }

        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Model name cannot be empty",
            ));
        }

        if config.embedding.base_url.is_empty() {
            errors.push(ValidationError::new(
                "embedding.base_url",
                "Base URL cannot be empty",
            ));
        }
    }

    fn validate_tools(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.tools.enabled && config.tools.socket_path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "tools.socket_path",
                "Socket path cannot be empty when tools are enabled",
            ));
        }
    }

    fn env_var_set(name: &str) -> bool {
        std::env::var(name).map(|v| !v.is_empty()).unwrap_or(false)
    }
}
