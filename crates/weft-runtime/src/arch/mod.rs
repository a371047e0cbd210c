//! Architecture-specific context switching.
//!
//! Each submodule provides the same surface: a `SavedRegs` layout for a
//! voluntarily-suspended context, `init_context` to prepare a fresh
//! fiber, and `switch` to save the current callee-saved state and jump
//! into another context.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")] {
        pub mod x86_64;
        pub use x86_64::{init_context, switch, SavedRegs};
    } else if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use aarch64::{init_context, switch, SavedRegs};
    } else {
        compile_error!("unsupported architecture");
    }
}
