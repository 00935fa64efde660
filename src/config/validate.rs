//! Configuration validation.

use crate::config::{Config, ModelConfig};
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_defaults(config)?;
    for (name, model) in &config.models {
        validate_model_shape(name, model)?;
    }
    Ok(())
}

/// Validate default settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let defaults = &config.defaults;

    if !(confidence::MIN..=confidence::MAX).contains(&defaults.min_confidence) {
        return Err(Error::ConfigValidation {
            message: format!(
                "min_confidence must be between {} and {}, got {}",
                confidence::MIN,
                confidence::MAX,
                defaults.min_confidence
            ),
        });
    }

    if defaults.top_k == 0 {
        return Err(Error::ConfigValidation {
            message: "top_k must be at least 1".to_string(),
        });
    }

    if let Some(ref model_name) = defaults.model
        && !config.models.contains_key(model_name)
    {
        return Err(Error::ModelNotFound {
            name: model_name.clone(),
        });
    }

    Ok(())
}

/// Validate the geometry settings of a model entry.
fn validate_model_shape(name: &str, model: &ModelConfig) -> Result<()> {
    if model.input_size == 0 {
        return Err(Error::ConfigValidation {
            message: format!("model '{name}': input_size must be at least 1"),
        });
    }

    if model.batch_size == 0 {
        return Err(Error::ConfigValidation {
            message: format!("model '{name}': batch_size must be at least 1"),
        });
    }

    Ok(())
}

/// Validate a model configuration and check its files exist.
pub fn validate_model_config(name: &str, model: &ModelConfig) -> Result<()> {
    validate_model_shape(name, model)?;

    if !model.path.exists() {
        return Err(Error::ModelFileNotFound {
            path: model.path.clone(),
        });
    }

    if !model.labels.exists() {
        return Err(Error::LabelsFileNotFound {
            path: model.labels.clone(),
        });
    }

    Ok(())
}

/// Get a model by name from the config.
pub fn get_model<'a>(config: &'a Config, name: &str) -> Result<&'a ModelConfig> {
    config.models.get(name).ok_or_else(|| Error::ModelNotFound {
        name: name.to_string(),
    })
}
