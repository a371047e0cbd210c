//! Error types for the weft runtime

use core::fmt;

/// Result type for runtime operations.
pub type LoomResult<T> = Result<T, LoomError>;

/// Errors from runtime setup and lifecycle operations.
///
/// The steady-state data path has no recoverable errors of its own:
/// syscall failures are results delivered to the caller, and the few
/// internal conditions with no safe continuation abort the process.
/// These variants cover the fallible setup paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoomError {
    /// A runtime (or offload context) is already installed on this thread.
    AlreadyInitialized,

    /// Operation requires a running runtime on this thread.
    NotInitialized,

    /// Configuration rejected by `validate`.
    InvalidConfig(&'static str),

    /// Stack or mapping failure.
    Memory(MemoryError),

    /// OS-level setup failure (epoll, socketpair, thread spawn), with errno.
    Os(i32),
}

impl fmt::Display for LoomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoomError::AlreadyInitialized => write!(f, "runtime already initialized"),
            LoomError::NotInitialized => write!(f, "no runtime on this thread"),
            LoomError::InvalidConfig(why) => write!(f, "invalid configuration: {}", why),
            LoomError::Memory(e) => write!(f, "memory error: {}", e),
            LoomError::Os(errno) => write!(f, "os error: errno {}", errno),
        }
    }
}

impl std::error::Error for LoomError {}

/// Stack-memory errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// mmap failed.
    AllocationFailed,

    /// mprotect on the guard page failed.
    ProtectionFailed,

    /// Requested stack size below the supported minimum.
    BadSize,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::AllocationFailed => write!(f, "stack allocation failed"),
            MemoryError::ProtectionFailed => write!(f, "guard page protection failed"),
            MemoryError::BadSize => write!(f, "bad stack size"),
        }
    }
}

impl From<MemoryError> for LoomError {
    fn from(e: MemoryError) -> Self {
        LoomError::Memory(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            format!("{}", LoomError::NotInitialized),
            "no runtime on this thread"
        );
        assert_eq!(
            format!("{}", LoomError::Memory(MemoryError::BadSize)),
            "memory error: bad stack size"
        );
    }

    #[test]
    fn conversion() {
        let e: LoomError = MemoryError::AllocationFailed.into();
        assert_eq!(e, LoomError::Memory(MemoryError::AllocationFailed));
    }
}
