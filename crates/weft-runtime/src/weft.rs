//! Fiber representation
//!
//! A `Weft` is a stackful, cooperatively scheduled fiber: saved
//! register state, an owned guard-paged stack, and a one-shot entry
//! closure. All access happens on the loom thread; the scheduler owns
//! every `Weft` it creates and releases it when the entry returns.

use crate::arch::SavedRegs;
use crate::memory::StackMemory;
use std::cell::{Cell, UnsafeCell};
use weft_core::{WeftId, WeftState};

pub(crate) struct Weft {
    pub(crate) id: WeftId,
    pub(crate) name: String,
    pub(crate) state: Cell<WeftState>,
    pub(crate) regs: UnsafeCell<SavedRegs>,
    pub(crate) stack: StackMemory,
    /// Taken exactly once by the entry trampoline.
    pub(crate) entry: Cell<Option<Box<dyn FnOnce()>>>,
}

impl Weft {
    pub(crate) fn new(
        id: WeftId,
        name: &str,
        stack: StackMemory,
        entry: Box<dyn FnOnce()>,
    ) -> Weft {
        Weft {
            id,
            name: name.to_string(),
            state: Cell::new(WeftState::Created),
            regs: UnsafeCell::new(SavedRegs::zeroed()),
            stack,
            entry: Cell::new(Some(entry)),
        }
    }
}
