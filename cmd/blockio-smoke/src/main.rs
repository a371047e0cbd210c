//! Smoke test for the blocking-I/O offload: create a file, write,
//! read back, stat, clean up - all through the fiber wrappers, with a
//! few fibers doing it concurrently.

use anyhow::{bail, Result};
use std::cell::Cell;
use std::ffi::CString;
use std::mem;
use std::rc::Rc;
use weft::{calls, spawn, Config, Runtime};

const FIBERS: usize = 8;

fn exercise(tag: usize) -> Result<()> {
    let path = std::env::temp_dir().join(format!("weft-smoke-{}-{}", std::process::id(), tag));
    let cpath = CString::new(path.to_str().unwrap())?;

    let fd = calls::open_mode(&cpath, libc::O_CREAT | libc::O_RDWR, 0o600);
    if fd < 0 {
        bail!("open failed, errno {}", std::io::Error::last_os_error());
    }

    let payload = format!("payload-{}", tag);
    let n = calls::write(fd, payload.as_bytes());
    if n != payload.len() as isize {
        bail!("short write: {}", n);
    }

    let mut buf = [0u8; 64];
    let n = calls::pread(fd, &mut buf, 0);
    if &buf[..n as usize] != payload.as_bytes() {
        bail!("readback mismatch");
    }

    let mut st: libc::stat = unsafe { mem::zeroed() };
    if calls::fstat(fd, &mut st) != 0 {
        bail!("fstat failed");
    }
    if st.st_size != payload.len() as i64 {
        bail!("size mismatch: {}", st.st_size);
    }

    calls::close(fd);
    calls::unlink(&cpath);
    println!("fiber {} ok ({} bytes)", tag, payload.len());
    Ok(())
}

fn main() -> Result<()> {
    let mut rt = Runtime::new(Config::default())?;

    let failures = rt.block_on(|| {
        let failures = Rc::new(Cell::new(0usize));
        for tag in 0..FIBERS {
            let f = failures.clone();
            spawn(&format!("smoke-{}", tag), move || {
                if let Err(e) = exercise(tag) {
                    eprintln!("fiber {} failed: {}", tag, e);
                    f.set(f.get() + 1);
                }
            });
        }
        failures
    });

    if failures.get() > 0 {
        bail!("{} fibers failed", failures.get());
    }
    println!("all {} fibers passed", FIBERS);
    Ok(())
}
