//! System configuration with sensible defaults.

// Layer 1: Standard library
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
use super::errors::SystemError;

/// Default load-balancer scan period.
pub const DEFAULT_LOAD_BALANCER_PERIOD: Duration = Duration::from_millis(100);

/// The pool never grows past this multiple of the hardware concurrency.
pub const POOL_CAP_FACTOR: usize = 2;

/// Configuration for [`ActorSystem`](crate::ActorSystem) construction.
///
/// # Examples
///
/// ```rust
/// use spindle_rt::SystemConfig;
/// use std::time::Duration;
///
/// // Defaults: one worker per hardware thread, no load balancer.
/// let config = SystemConfig::default();
/// assert_eq!(config.worker_count, 0);
///
/// // Builder for custom configuration.
/// let config = SystemConfig::builder()
///     .with_worker_count(4)
///     .with_load_balancer(Duration::from_millis(50))
///     .build()
///     .unwrap();
/// assert_eq!(config.worker_count, 4);
/// assert!(config.enable_load_balancer);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Worker threads to start with; `0` means one per hardware thread.
    /// The pool growth cap stays at [`POOL_CAP_FACTOR`] × hardware
    /// concurrency regardless of the starting count.
    pub worker_count: usize,

    /// Start the load-balancer thread at construction.
    pub enable_load_balancer: bool,

    /// How often the load balancer scans for stuck workers.
    pub load_balancer_period: Duration,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            worker_count: 0,
            enable_load_balancer: false,
            load_balancer_period: DEFAULT_LOAD_BALANCER_PERIOD,
        }
    }
}

impl SystemConfig {
    /// Create a new configuration builder.
    pub fn builder() -> SystemConfigBuilder {
        SystemConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), SystemError> {
        if self.enable_load_balancer && self.load_balancer_period.is_zero() {
            return Err(SystemError::InvalidConfig {
                reason: "load_balancer_period must be non-zero".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn resolved_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get()
        } else {
            self.worker_count
        }
    }

    pub(crate) fn pool_cap() -> usize {
        POOL_CAP_FACTOR * num_cpus::get()
    }
}

/// Builder for [`SystemConfig`].
#[derive(Debug, Default)]
pub struct SystemConfigBuilder {
    config: SystemConfig,
}

impl SystemConfigBuilder {
    /// Set the starting worker count (`0` = hardware concurrency).
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    /// Enable the load balancer with the given scan period.
    pub fn with_load_balancer(mut self, period: Duration) -> Self {
        self.config.enable_load_balancer = true;
        self.config.load_balancer_period = period;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<SystemConfig, SystemError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.enable_load_balancer);
        assert_eq!(config.load_balancer_period, DEFAULT_LOAD_BALANCER_PERIOD);
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = SystemConfig::builder()
            .with_worker_count(3)
            .with_load_balancer(Duration::from_millis(25))
            .build()
            .unwrap();
        assert_eq!(config.worker_count, 3);
        assert!(config.enable_load_balancer);
        assert_eq!(config.load_balancer_period, Duration::from_millis(25));
    }

    #[test]
    fn test_zero_balancer_period_rejected() {
        let result = SystemConfig::builder()
            .with_load_balancer(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(SystemError::InvalidConfig { .. })));
    }

    #[test]
    fn test_worker_count_resolution() {
        let config = SystemConfig::default();
        assert_eq!(config.resolved_worker_count(), num_cpus::get());
        let config = SystemConfig::builder().with_worker_count(2).build().unwrap();
        assert_eq!(config.resolved_worker_count(), 2);
        assert_eq!(SystemConfig::pool_cap(), POOL_CAP_FACTOR * num_cpus::get());
    }
}
