//! Interrupt-context bookkeeping.
//!
//! Interrupt nesting is a property of the executing context, so the counter is
//! thread-local: a thread inside [`interrupt_enter`]/[`interrupt_leave`] is
//! treated as an interrupt handler by every blocking call it makes.

use core::cell::Cell;

thread_local! {
    static INTERRUPT_NESTING: Cell<u8> = const { Cell::new(0) };
}

/// Marks entry into an interrupt handler.
pub fn interrupt_enter() {
    INTERRUPT_NESTING.with(|n| n.set(n.get().saturating_add(1)));
}

/// Marks exit from an interrupt handler. Unbalanced calls are ignored.
pub fn interrupt_leave() {
    INTERRUPT_NESTING.with(|n| n.set(n.get().saturating_sub(1)));
}

pub fn interrupt_nesting() -> u8 {
    INTERRUPT_NESTING.with(Cell::get)
}

pub fn in_interrupt() -> bool {
    interrupt_nesting() > 0
}

/// RAII guard running the enclosing scope as an interrupt handler.
pub struct InterruptGuard {
    _private: (),
}

impl InterruptGuard {
    pub fn enter() -> Self {
        interrupt_enter();
        Self { _private: () }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        interrupt_leave();
    }
}
