//! Fiber stack memory.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::StackMemory;
    } else {
        compile_error!("no stack memory implementation for this platform");
    }
}
