use crate::config::Config;
use crate::error::{AdvisrError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_indexing(config, &mut errors);
        Self::validate_llm(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AdvisrError::ConfigValidation { errors })
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

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory cannot be empty",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let retrieval = &config.retrieval;

        if retrieval.max_results == 0 {
            errors.push(ValidationError::new(
                "retrieval.max_results",
                "Max results must be greater than 0",
            ));
        }

        if retrieval.min_title_match_len == 0 {
            errors.push(ValidationError::new(
                "retrieval.min_title_match_len",
                "Minimum title match length must be greater than 0",
            ));
        }

        let dept = &retrieval.preferred_department;
        if dept.len() < 3
            || dept.len() > 4
            || !dept.chars().all(|c| c.is_ascii_uppercase())
        {
            errors.push(ValidationError::new(
                "retrieval.preferred_department",
                format!(
                    "Preferred department must be a 3-4 letter uppercase code, got '{}'",
                    dept
                ),
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.model.is_empty() {
            errors.push(ValidationError::new(
                "embedding.model",
                "Embedding model cannot be empty",
            ));
        }

        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "Batch size must be greater than 0",
            ));
        }
    }

    fn validate_indexing(config: &Config, errors: &mut Vec<ValidationError>) {
        let indexing = &config.indexing;

        if indexing.vector_dim == 0 {
            errors.push(ValidationError::new(
                "indexing.vector_dim",
                "Vector dimension must be greater than 0",
            ));
        }

        if indexing.hnsw_m == 0 || indexing.hnsw_m > 64 {
            errors.push(ValidationError::new(
                "indexing.hnsw_m",
                "HNSW M must be between 1 and 64",
            ));
        }

        if indexing.hnsw_ef_construction < indexing.hnsw_m {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_construction",
                "ef_construction must be at least M",
            ));
        }

        if indexing.hnsw_ef_search == 0 {
            errors.push(ValidationError::new(
                "indexing.hnsw_ef_search",
                "ef_search must be greater than 0",
            ));
        }
    }

    fn validate_llm(config: &Config, errors: &mut Vec<ValidationError>) {
        if !config.llm.enabled {
            return;
        }

        if config.llm.api_key_env.is_empty() {
            errors.push(ValidationError::new(
                "llm.api_key_env",
                "API key environment variable name cannot be empty when LLM is enabled",
            ));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            errors.push(ValidationError::new(
                "llm.temperature",
                format!("Temperature must be in [0.0, 2.0], got {}", config.llm.temperature),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_passes() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_bad_preferred_department() {
        let mut config = Config::default();
        config.retrieval.preferred_department = "comp".to_string();
        assert!(ConfigValidator::validate(&config).is_err());

        config.retrieval.preferred_department = "COMPUTER".to_string();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let mut config = Config::default();
        config.retrieval.max_results = 0;
        let result = ConfigValidator::validate(&config);
        assert!(matches!(
            result,
            Err(AdvisrError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_llm_checks_only_when_enabled() {
        let mut config = Config::default();
        config.llm.temperature = 9.0;
        // Disabled LLM: temperature not checked
        assert!(ConfigValidator::validate(&config).is_ok());

        config.llm.enabled = true;
        assert!(ConfigValidator::validate(&config).is_err());
    }
}
