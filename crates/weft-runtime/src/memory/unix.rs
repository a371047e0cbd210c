//! Unix stack memory using mmap
//!
//! Each fiber owns one anonymous mapping: a PROT_NONE guard page at the
//! low end (stacks grow down), usable stack above it. The mapping is
//! released when the fiber is.

use weft_core::constants::{GUARD_SIZE, MIN_STACK_SIZE, PAGE_SIZE};
use weft_core::error::MemoryError;

/// An owned, guard-paged stack region.
pub struct StackMemory {
    base: *mut u8,
    total: usize,
}

impl StackMemory {
    /// Map a stack with `size` usable bytes (rounded up to page size)
    /// plus a guard page.
    pub fn alloc(size: usize) -> Result<StackMemory, MemoryError> {
        if size < MIN_STACK_SIZE {
            return Err(MemoryError::BadSize);
        }
        let usable = (size + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
        let total = usable + GUARD_SIZE;

        let base = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                total,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            return Err(MemoryError::AllocationFailed);
        }
        let base = base as *mut u8;

        // Guard page at the low end; overflow faults instead of
        // corrupting the neighbouring mapping.
        let ret = unsafe { libc::mprotect(base as *mut libc::c_void, GUARD_SIZE, libc::PROT_NONE) };
        if ret != 0 {
            unsafe { libc::munmap(base as *mut libc::c_void, total) };
            return Err(MemoryError::ProtectionFailed);
        }

        Ok(StackMemory { base, total })
    }

    /// High end of the usable region (initial stack pointer).
    #[inline]
    pub fn top(&self) -> *mut u8 {
        unsafe { self.base.add(self.total) }
    }

    /// Usable bytes (excluding the guard page).
    #[inline]
    pub fn usable(&self) -> usize {
        self.total - GUARD_SIZE
    }
}

impl Drop for StackMemory {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_release() {
        let s = StackMemory::alloc(64 * 1024).unwrap();
        assert!(s.usable() >= 64 * 1024);
        assert_eq!(s.top() as usize % 16, 0);
        // Top of stack must be writable.
        unsafe {
            let p = s.top().sub(8);
            p.write_bytes(0xAB, 8);
        }
    }

    #[test]
    fn rejects_tiny_stacks() {
        assert!(matches!(StackMemory::alloc(1024), Err(MemoryError::BadSize)));
    }

    #[test]
    fn rounds_to_page() {
        let s = StackMemory::alloc(MIN_STACK_SIZE + 1).unwrap();
        assert_eq!(s.usable() % PAGE_SIZE, 0);
    }
}
