use std::time::Duration;

/// Process configuration: buffer pool capacity, and the lock manager's
/// bounded condition-wait. Plain struct with documented defaults,
/// overridable from the environment, rather than pulling in a config
/// framework for two knobs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of resident pages the buffer pool will hold at once.
    pub buffer_pool_capacity: usize,
    /// How long a blocked `acquire_*` call waits on its page's condition
    /// variable before re-checking its grant condition. Not a cancellation
    /// signal — purely bounds how promptly a spurious wakeup or a
    /// just-granted neighbor is noticed.
    pub lock_wait_timeout: Duration,
}

impl Config {
    pub const DEFAULT_BUFFER_POOL_CAPACITY: usize = 50;
    pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(1);

    /// Reads overrides from `DB_BUFFER_POOL_CAPACITY` and
    /// `DB_LOCK_WAIT_TIMEOUT_MS`, falling back to the documented defaults
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let buffer_pool_capacity = std::env::var("DB_BUFFER_POOL_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(Self::DEFAULT_BUFFER_POOL_CAPACITY);

        let lock_wait_timeout = std::env::var("DB_LOCK_WAIT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_LOCK_WAIT_TIMEOUT);

        Self {
            buffer_pool_capacity,
            lock_wait_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_pool_capacity: Self::DEFAULT_BUFFER_POOL_CAPACITY,
            lock_wait_timeout: Self::DEFAULT_LOCK_WAIT_TIMEOUT,
        }
    }
}
