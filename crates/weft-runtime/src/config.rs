//! Runtime configuration

use weft_core::constants::{DEFAULT_STACK_SIZE, MIN_STACK_SIZE};
use weft_core::{env_get, LoomError, LoomResult};

/// Configuration for one runtime.
///
/// `Default` reads the environment, so deployments can tune a binary
/// without code changes:
///
/// - `WEFT_IO_WORKERS` - blocking-I/O worker threads (default 2)
/// - `WEFT_STACK_SIZE` - usable stack bytes per fiber (default 256 KiB)
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker threads executing offloaded blocking syscalls. Bounds how
    /// many blocking calls can be in flight in parallel; at least 2 is
    /// recommended so a call that blocks indefinitely cannot starve the
    /// pool on its own.
    pub io_workers: usize,

    /// Usable stack bytes per fiber (a guard page is added on top).
    pub stack_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            io_workers: env_get("WEFT_IO_WORKERS", 2),
            stack_size: env_get("WEFT_STACK_SIZE", DEFAULT_STACK_SIZE),
        }
    }
}

impl Config {
    pub fn validate(&self) -> LoomResult<()> {
        if self.io_workers == 0 {
            return Err(LoomError::InvalidConfig("io_workers must be at least 1"));
        }
        if self.stack_size < MIN_STACK_SIZE {
            return Err(LoomError::InvalidConfig("stack_size below minimum"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers() {
        let c = Config {
            io_workers: 0,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(LoomError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_tiny_stack() {
        let c = Config {
            stack_size: 1024,
            ..Config::default()
        };
        assert!(matches!(c.validate(), Err(LoomError::InvalidConfig(_))));
    }
}
