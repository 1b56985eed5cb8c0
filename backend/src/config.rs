//! Worker configuration loaded via OrthoConfig.
//!
//! Values come from `BIRDWATCH_*` environment variables and an optional
//! config file, environment first. The worker's own flags are parsed
//! separately with clap and override individual settings.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{RetryPolicy, SchedulerConfig};

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_ROTATION_INTERVAL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_READ_ATTEMPTS: u32 = 3;

/// Settings for the rotation worker and its store.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BIRDWATCH")]
pub struct BirdwatchSettings {
    /// PostgreSQL connection string. Required.
    pub database_url: Option<String>,
    /// Upper bound on pooled connections.
    pub pool_max_size: Option<u32>,
    /// Seconds between bird-of-the-day advances.
    pub rotation_interval_secs: Option<u64>,
    /// Apply pending migrations before starting.
    #[ortho_config(default = false)]
    pub run_migrations: bool,
    /// Attempts per store read before giving up.
    pub read_attempts: Option<u32>,
}

/// Raised when a required setting is absent or unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("BIRDWATCH_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

impl BirdwatchSettings {
    /// The configured connection string.
    ///
    /// # Errors
    ///
    /// [`SettingsError::MissingDatabaseUrl`] when unset or blank.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }

    /// Pool size, falling back to 10.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Zero`] when configured as zero.
    pub fn pool_max_size(&self) -> Result<u32, SettingsError> {
        positive(
            self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE),
            "pool_max_size",
        )
    }

    /// Rotation interval, falling back to one day.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Zero`] when configured as zero.
    pub fn rotation_interval(&self) -> Result<Duration, SettingsError> {
        let secs = positive(
            self.rotation_interval_secs
                .unwrap_or(DEFAULT_ROTATION_INTERVAL_SECS),
            "rotation_interval_secs",
        )?;
        Ok(Duration::from_secs(secs))
    }

    /// Retry policy for store reads.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Zero`] when `read_attempts` is zero.
    pub fn read_policy(&self) -> Result<RetryPolicy, SettingsError> {
        let attempts = positive(
            self.read_attempts.unwrap_or(DEFAULT_READ_ATTEMPTS),
            "read_attempts",
        )?;
        Ok(RetryPolicy::with_attempts(attempts))
    }

    /// Scheduler timing with the configured interval.
    ///
    /// # Errors
    ///
    /// See [`BirdwatchSettings::rotation_interval`].
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, SettingsError> {
        Ok(SchedulerConfig {
            interval: self.rotation_interval()?,
            ..SchedulerConfig::default()
        })
    }
}

fn positive<T>(value: T, name: &'static str) -> Result<T, SettingsError>
where
    T: PartialEq + Default,
{
    if value == T::default() {
        return Err(SettingsError::Zero { name });
    }
    Ok(value)
}
