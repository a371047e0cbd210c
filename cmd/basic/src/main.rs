//! Minimal fiber demo: spawn, yield, interleave.

use anyhow::Result;
use weft::{spawn, yield_now, Config, Runtime};

fn main() -> Result<()> {
    let mut rt = Runtime::new(Config::default())?;

    rt.block_on(|| {
        for id in 0..3 {
            spawn(&format!("worker-{}", id), move || {
                for step in 0..3 {
                    println!("weft {} step {}", id, step);
                    yield_now();
                }
            });
        }
        println!("main weft spawned 3 children");
    });

    println!("quiescent, exiting");
    Ok(())
}
