//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ConnectionConfig, LogOutput, LoggingConfig, PerchConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &PerchConfig) -> ConfigResult<()> {
    validate_connection_config(&config.connection)?;
    validate_logging_config(&config.logging)?;
    validate_plugins_config(config)?;
    Ok(())
}

/// Validates connection settings.
fn validate_connection_config(connection: &ConnectionConfig) -> ConfigResult<()> {
    if connection.host.is_empty() {
        return Err(ConfigError::missing_field("connection.host"));
    }

    if connection.port == 0 {
        return Err(ConfigError::InvalidPort(connection.port));
    }

    if connection.nick.is_empty() {
        return Err(ConfigError::missing_field("connection.nick"));
    }

    if connection.nick.contains(' ') {
        return Err(ConfigError::validation("Nick cannot contain spaces"));
    }

    let channel = connection.channel.trim_start_matches('#');
    if channel.is_empty() {
        return Err(ConfigError::missing_field("connection.channel"));
    }

    if channel.contains(' ') {
        return Err(ConfigError::validation("Channel cannot contain spaces"));
    }

    Ok(())
}

/// Validates logging settings. Levels are already typed; only the
/// combinations are checked here.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter target cannot be empty"));
    }

    Ok(())
}

/// Validates plugin settings.
fn validate_plugins_config(config: &PerchConfig) -> ConfigResult<()> {
    if let Some(id) = config.plugins.disabled.iter().find(|id| id.is_empty()) {
        return Err(ConfigError::validation(format!(
            "Disabled plugin unit identity cannot be empty: {id:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn valid() -> PerchConfig {
        let mut config = PerchConfig::default();
        config.connection.nick = "perchbot".into();
        config.connection.channel = "#chan".into();
        config
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_validate_default_config_needs_channel() {
        let result = validate_config(&PerchConfig::default());
        assert!(
            matches!(result, Err(ConfigError::MissingField { ref field }) if field == "connection.channel")
        );
    }

    #[test]
    fn test_validate_template_config() {
        assert!(validate_config(&PerchConfig::template()).is_ok());
    }

    #[test]
    fn test_validate_empty_nick() {
        let mut config = valid();
        config.connection.nick.clear();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_validate_hash_only_channel() {
        let mut config = valid();
        config.connection.channel = "#".into();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_port() {
        let mut config = valid();
        config.connection.port = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidPort(0))
        ));
    }

    #[test]
    fn test_validate_file_output_needs_path() {
        let mut config = valid();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("perch.log"));
        assert!(validate_config(&config).is_ok());
    }
}
