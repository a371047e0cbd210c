//! Per-thread signal discipline.

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::block_all_signals;
    } else {
        compile_error!("no signal implementation for this platform");
    }
}
