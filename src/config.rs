//! Pool configuration options

/// Probe budget used by `acquire`, `try_acquire` and friends when no
/// explicit tolerance is given.
pub const DEFAULT_TOLERANCE: usize = 8;

/// Hard cap on the number of empty shells kept for reuse.
pub const DEFAULT_MAX_SHELLS: usize = 128;

/// Configuration for specification pool behavior
///
/// # Examples
///
/// ```
/// use esox_specpool::PoolConfiguration;
///
/// let config = PoolConfiguration::new()
///     .with_default_tolerance(4)
///     .with_max_shells(32)
///     .with_reset_on_release(false);
///
/// assert_eq!(config.default_tolerance, 4);
/// assert_eq!(config.max_shells, 32);
/// assert!(!config.reset_on_release);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfiguration {
    /// Maximum number of bagged values probed per acquisition
    pub default_tolerance: usize,

    /// Number of empty shells retained before the shell bag is flushed
    pub max_shells: usize,

    /// Whether released values get their `reset` hook applied
    pub reset_on_release: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            default_tolerance: DEFAULT_TOLERANCE,
            max_shells: DEFAULT_MAX_SHELLS,
            reset_on_release: true,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the probe budget used when no tolerance is passed explicitly
    pub fn with_default_tolerance(mut self, tolerance: usize) -> Self {
        self.default_tolerance = tolerance;
        self
    }

    /// Set the shell bag cap
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_specpool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max_shells(0);
    /// assert_eq!(config.max_shells, 0);
    /// ```
    pub fn with_max_shells(mut self, max_shells: usize) -> Self {
        self.max_shells = max_shells;
        self
    }

    /// Enable or disable the reset hook on release
    pub fn with_reset_on_release(mut self, reset: bool) -> Self {
        self.reset_on_release = reset;
        self
    }
}
