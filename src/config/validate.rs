//! Configuration validation.

use crate::config::Config;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_engine(config)?;
    validate_defaults(config)?;
    Ok(())
}

/// Validate engine tuning.
fn validate_engine(config: &Config) -> Result<()> {
    let engine = &config.engine;

    if engine.cache_max_bytes == 0 {
        return Err(Error::ConfigValidation {
            message: "cache_max_bytes must be at least 1".to_string(),
        });
    }

    if engine.cache_max_frames == 0 {
        return Err(Error::ConfigValidation {
            message: "cache_max_frames must be at least 1".to_string(),
        });
    }

    if engine.max_seek_attempts == 0 {
        return Err(Error::ConfigValidation {
            message: "max_seek_attempts must be at least 1".to_string(),
        });
    }

    Ok(())
}

/// Validate default source settings.
fn validate_defaults(config: &Config) -> Result<()> {
    let drc_scale = config.defaults.drc_scale;
    if !drc_scale.is_finite() || drc_scale < 0.0 {
        return Err(Error::ConfigValidation {
            message: format!("drc_scale must be a non-negative number, got {drc_scale}"),
        });
    }

    if let Some(track) = config.defaults.track
        && track < -1
    {
        return Err(Error::ConfigValidation {
            message: format!("track must be -1 (auto) or a track index, got {track}"),
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_cache_bytes() {
        let mut config = Config::default();
        config.engine.cache_max_bytes = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_seek_attempts() {
        let mut config = Config::default();
        config.engine.max_seek_attempts = 0;
        let result = validate_config(&config);
        assert!(matches!(result.unwrap_err(), Error::ConfigValidation { .. }));
    }

    #[test]
    fn test_validate_negative_drc_scale() {
        let mut config = Config::default();
        config.defaults.drc_scale = -1.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_nan_drc_scale() {
        let mut config = Config::default();
        config.defaults.drc_scale = f32::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_track_index() {
        let mut config = Config::default();
        config.defaults.track = Some(-1);
        assert!(validate_config(&config).is_ok());
        config.defaults.track = Some(-3);
        assert!(validate_config(&config).is_err());
    }
}
