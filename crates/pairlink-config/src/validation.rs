// SPDX-FileCopyrightText: 2026 Pairlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation of configuration values.

use pairlink_core::PairlinkError;

use crate::model::PairlinkConfig;

/// Validate value ranges that serde cannot express.
pub fn validate_config(config: &PairlinkConfig) -> Result<(), PairlinkError> {
    if config.conversation.ttl_secs == 0 {
        return Err(PairlinkError::Config(
            "conversation.ttl_secs must be greater than zero".to_string(),
        ));
    }

    if config.limits.per_minute == 0 || config.limits.per_hour == 0 || config.limits.per_day == 0 {
        return Err(PairlinkError::Config(
            "all rate-limit window capacities must be greater than zero".to_string(),
        ));
    }

    if config.limits.per_minute > config.limits.per_hour
        || config.limits.per_hour > config.limits.per_day
    {
        return Err(PairlinkError::Config(
            "rate-limit capacities must not shrink across wider windows".to_string(),
        ));
    }

    if config.guard.default_ttl_secs == 0 {
        return Err(PairlinkError::Config(
            "guard.default_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if config.executor.default_timeout_secs == 0 {
        return Err(PairlinkError::Config(
            "executor.default_timeout_secs must be greater than zero".to_string(),
        ));
    }

    if config.executor.sandbox_image.is_empty() {
        return Err(PairlinkError::Config(
            "executor.sandbox_image must not be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn default_config_validates() {
        let config = PairlinkConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let config = load_config_from_str("[conversation]\nttl_secs = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn zero_window_capacity_is_rejected() {
        let config = load_config_from_str("[limits]\nper_hour = 0").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn inverted_window_capacities_are_rejected() {
        let config = load_config_from_str("[limits]\nper_minute = 200").unwrap();
        assert!(validate_config(&config).is_err());
    }
}
