//! Loading `SimConfig` tuning from JSON.
//!
//! Sections and fields left out of the file keep their defaults; the result
//! is validated before it is returned.

use std::path::Path;

use demiurge_logic::config::SimConfig;

use crate::error::SimError;

pub fn from_json(json: &str) -> Result<SimConfig, SimError> {
    let config: SimConfig =
        serde_json::from_str(json).map_err(|e| SimError::Validation(format!("tuning: {e}")))?;
    config.validate()?;
    Ok(config)
}

pub fn load(path: impl AsRef<Path>) -> Result<SimConfig, SimError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| SimError::NotFound(format!("tuning file {}: {e}", path.display())))?;
    let config = from_json(&json)?;
    log::info!("loaded tuning from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tuning_is_valid() {
        let config = from_json(include_str!("../../../data/tuning.json")).unwrap();
        assert_eq!(config.physical.hunger, SimConfig::default().physical.hunger);
    }

    #[test]
    fn test_syntax_error_is_validation() {
        assert!(matches!(from_json("{"), Err(SimError::Validation(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load("/nonexistent/tuning.json"), Err(SimError::NotFound(_))));
    }
}
