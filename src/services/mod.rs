// Capacity accounting and reservations
pub mod energy_zones;
pub mod zone_ledger;

// Generic resource plumbing
pub mod repository;
pub mod workflow;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use zone_ledger::Thresholds;

/// Tunables shared by every service, resolved once from [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Attempts made by a version-guarded write before giving up with 409.
    pub lock_attempts: u32,
    pub thresholds: Thresholds,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            lock_attempts: 3,
            thresholds: Thresholds::default(),
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            default_page_size: config.api_default_page_size,
            max_page_size: config.api_max_page_size,
            lock_attempts: config.optimistic_lock_attempts.max(1),
            thresholds: Thresholds::from_config(config)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn settings_follow_config() {
        let mut config = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            8080,
            "test".to_string(),
        );
        config.zone_amber_threshold = 60.0;
        config.zone_red_threshold = 85.5;
        config.api_max_page_size = 50;

        let settings = ServiceSettings::from_config(&config).unwrap();
        assert_eq!(settings.max_page_size, 50);
        assert_eq!(settings.thresholds.amber(), dec!(60));
        assert_eq!(settings.thresholds.red(), dec!(85.5));
    }
}
