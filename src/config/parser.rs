use super::Config;
use crate::errors::Error;
use std::fs;

use tracing::info;

/// Loads and parses the runtime configuration from a YAML file
///
/// # Arguments
///
/// * `file_path` - Path to the YAML configuration file
///
/// # Errors
///
/// Returns an error if the file cannot be read or the YAML content cannot be
/// parsed into a `Config`
pub fn load_config(file_path: &str) -> Result<Config, Error> {
    let yaml_str = fs::read_to_string(file_path)?;
    let config: Config = serde_yaml::from_str(&yaml_str)?;
    info!("Loaded configuration from {}", file_path);
    Ok(config)
}
