//! Job configuration.

use tracing::warn;

use commons_core::{CoreError, CoreResult};

/// Smallest worker stack accepted from configuration.
const MIN_STACK_SIZE: usize = 16 * 1024;

/// Job configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Worker thread name, also used as the `job` field in logs
    pub name: String,
    /// Worker stack size in bytes (platform default when `None`)
    pub stack_size: Option<usize>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: "async-job".to_string(),
            stack_size: None,
        }
    }
}

impl JobConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Read `<PREFIX>_NAME` and `<PREFIX>_STACK_SIZE` from the environment.
    ///
    /// Missing values keep their defaults; invalid values are logged and
    /// ignored.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a caller-supplied lookup.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let name_key = format!("{prefix}_NAME");
        if let Some(name) = lookup(&name_key) {
            let name = name.trim();
            if name.is_empty() {
                warn!(key = %name_key, "empty job name; keeping default");
            } else {
                config.name = name.to_string();
            }
        }

        let stack_key = format!("{prefix}_STACK_SIZE");
        if let Some(raw) = lookup(&stack_key) {
            match parse_stack_size(&raw) {
                Ok(bytes) => config.stack_size = Some(bytes),
                Err(err) => warn!(key = %stack_key, error = %err, "ignoring stack size"),
            }
        }

        config
    }
}

fn parse_stack_size(raw: &str) -> CoreResult<usize> {
    let bytes: usize = raw
        .trim()
        .parse()
        .map_err(|e| CoreError::validation(format!("stack size {raw:?}: {e}")))?;

    if bytes < MIN_STACK_SIZE {
        return Err(CoreError::validation(format!(
            "stack size {bytes} is below the minimum of {MIN_STACK_SIZE}"
        )));
    }
    Ok(bytes)
}
