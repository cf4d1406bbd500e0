//! Configuration for the todo application.

use std::time::Duration;

/// Environment variable overriding the delayed-add delay, in milliseconds
pub const DELAY_ENV: &str = "TODO_DELAY_MS";

/// Environment variable overriding the simulated server latency, in milliseconds
pub const SERVER_LATENCY_ENV: &str = "TODO_SERVER_LATENCY_MS";

/// Todo application configuration
///
/// # Example
///
/// ```
/// use todo::TodoConfig;
/// use std::time::Duration;
///
/// let config = TodoConfig::default().with_delay(Duration::from_millis(10));
/// assert_eq!(config.delay, Duration::from_millis(10));
/// assert_eq!(config.server_latency, Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodoConfig {
    /// How long `AddDelayedTodo` waits before adding
    pub delay: Duration,
    /// How long the simulated server takes to answer
    pub server_latency: Duration,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            server_latency: Duration::from_millis(1000),
        }
    }
}

impl TodoConfig {
    /// Set the delayed-add delay
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set the simulated server latency
    #[must_use]
    pub const fn with_server_latency(mut self, latency: Duration) -> Self {
        self.server_latency = latency;
        self
    }

    /// Load configuration from the process environment
    ///
    /// Reads [`DELAY_ENV`] and [`SERVER_LATENCY_ENV`]. Missing or invalid
    /// values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            delay: millis(&lookup, DELAY_ENV).unwrap_or(defaults.delay),
            server_latency: millis(&lookup, SERVER_LATENCY_ENV).unwrap_or(defaults.server_latency),
        }
    }
}

fn millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(error) => {
            tracing::warn!(key, value = %raw, %error, "Invalid duration, using default");
            None
        },
    }
}
