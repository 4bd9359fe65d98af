//! Resource manager configuration.

use std::fmt;
use std::str::FromStr;

use super::defaults::{DEFAULT_CONCURRENT_REFRESH, DEFAULT_STAMP_IMPORTS};

/// What `refresh_available()` does while a cycle is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrentRefresh {
    /// Remember the request and run exactly one more cycle afterwards.
    Coalesce,
    /// Ignore the request.
    Drop,
}

impl fmt::Display for ConcurrentRefresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coalesce => write!(f, "coalesce"),
            Self::Drop => write!(f, "drop"),
        }
    }
}

impl FromStr for ConcurrentRefresh {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coalesce" => Ok(Self::Coalesce),
            "drop" => Ok(Self::Drop),
            other => Err(format!("unknown refresh policy '{}'", other)),
        }
    }
}

/// Configuration for the resource manager.
///
/// # Example
///
/// ```
/// use mapstack::config::{ConcurrentRefresh, ResourceConfig};
///
/// let config = ResourceConfig::default();
/// assert_eq!(config.concurrent_refresh(), ConcurrentRefresh::Coalesce);
///
/// let config = ResourceConfig::new()
///     .with_concurrent_refresh(ConcurrentRefresh::Drop)
///     .with_stamp_imports(false);
/// assert!(!config.stamp_imports());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceConfig {
    concurrent_refresh: ConcurrentRefresh,
    stamp_imports: bool,
}

impl ResourceConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for refresh requests arriving mid-cycle.
    pub fn with_concurrent_refresh(mut self, policy: ConcurrentRefresh) -> Self {
        self.concurrent_refresh = policy;
        self
    }

    /// Set whether newly imported resources get a refreshed-at timestamp.
    pub fn with_stamp_imports(mut self, stamp: bool) -> Self {
        self.stamp_imports = stamp;
        self
    }

    pub fn concurrent_refresh(&self) -> ConcurrentRefresh {
        self.concurrent_refresh
    }

    pub fn stamp_imports(&self) -> bool {
        self.stamp_imports
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            concurrent_refresh: DEFAULT_CONCURRENT_REFRESH,
            stamp_imports: DEFAULT_STAMP_IMPORTS,
        }
    }
}
