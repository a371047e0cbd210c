//! # weft-core
//!
//! Core types for the weft fiber runtime.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Everything that touches the OS (context switching, stacks, epoll,
//! signals, the blocking-I/O offload) lives in `weft-runtime` and
//! `weft-blockio`.
//!
//! ## Modules
//!
//! - `id` - fiber identifier type
//! - `state` - fiber lifecycle states
//! - `error` - error types
//! - `wprint` - leveled stderr logging macros
//! - `env` - environment variable helpers

#![allow(dead_code)]

pub mod env;
pub mod error;
pub mod id;
pub mod state;
pub mod wprint;

pub use env::{env_get, env_get_bool};
pub use error::{LoomError, LoomResult, MemoryError};
pub use id::WeftId;
pub use state::WeftState;

/// Shared constants.
pub mod constants {
    /// Page size assumed for stack layout (guard page granularity).
    pub const PAGE_SIZE: usize = 4096;

    /// Guard region below each fiber stack (one page, PROT_NONE).
    pub const GUARD_SIZE: usize = PAGE_SIZE;

    /// Default usable stack per fiber.
    pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

    /// Smallest stack `Config::validate` accepts.
    pub const MIN_STACK_SIZE: usize = 16 * 1024;

    /// Sentinel for "no fiber".
    pub const WEFT_NONE: u32 = u32::MAX;
}
