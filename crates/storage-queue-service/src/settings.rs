//! Service configuration loading

use storage_queue_api::{ConfigError, ServiceConfig};
use tracing::info;

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;

/// Environment variable naming an extra configuration file
pub const CONFIG_FILE_VARIABLE: &str = "SQ_CONFIG_FILE";

/// Prefix for configuration environment variables, e.g. `SQ__SERVER__PORT`
pub const ENVIRONMENT_PREFIX: &str = "SQ";

/// Connection string used when none is configured
pub const FALLBACK_CONNECTION_STRING_VARIABLE: &str = "AzureWebJobsStorage";

/// Configuration together with where it came from
///
/// Loading happens before logging is set up, so the sources are kept here
/// and reported through [`LoadedConfig::log_sources`] once it is.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    /// Value of `SQ_CONFIG_FILE`, when one was loaded
    pub explicit_path: Option<String>,
    /// Whether the connection string came from `AzureWebJobsStorage`
    pub connection_string_from_fallback: bool,
}

impl LoadedConfig {
    /// Report the configuration sources that were used
    pub fn log_sources(&self) {
        if let Some(path) = &self.explicit_path {
            info!(path = %path, "Loaded configuration from explicit path");
        }
        if self.connection_string_from_fallback {
            info!(
                variable = FALLBACK_CONNECTION_STRING_VARIABLE,
                "Using storage connection string from environment"
            );
        }
    }
}

/// Load the service configuration
///
/// Sources, later ones overriding earlier ones:
///  1. `config/service.yaml` relative to the working directory, if present
///  2. the file named by `SQ_CONFIG_FILE`, which must exist when set
///  3. environment variables prefixed `SQ__`, using `__` between sections
///
/// A storage connection string that is still missing afterwards is taken
/// from `AzureWebJobsStorage`.
pub fn load_config() -> Result<LoadedConfig, ConfigError> {
    let mut builder = config::Config::builder().add_source(
        config::File::with_name("config/service")
            .required(false)
            .format(config::FileFormat::Yaml),
    );

    let explicit_path = std::env::var(CONFIG_FILE_VARIABLE)
        .ok()
        .filter(|path| !path.is_empty());
    if let Some(path) = &explicit_path {
        builder = builder.add_source(
            config::File::with_name(path)
                .required(true)
                .format(config::FileFormat::Yaml),
        );
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENVIRONMENT_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Parsing {
            message: e.to_string(),
        })?;

    let mut service_config: ServiceConfig =
        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Parsing {
                message: e.to_string(),
            })?;

    let connection_string_from_fallback = apply_connection_string_fallback(&mut service_config);
    service_config.validate()?;
    Ok(LoadedConfig {
        config: service_config,
        explicit_path,
        connection_string_from_fallback,
    })
}

/// Returns true when the fallback variable supplied the connection string
fn apply_connection_string_fallback(service_config: &mut ServiceConfig) -> bool {
    if service_config.storage.in_memory || service_config.storage.connection_string.is_some() {
        return false;
    }

    match std::env::var(FALLBACK_CONNECTION_STRING_VARIABLE) {
        Ok(connection_string) if !connection_string.is_empty() => {
            service_config.storage.connection_string = Some(connection_string);
            true
        }
        _ => false,
    }
}
