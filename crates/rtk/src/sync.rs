//! Lock primitives shared by the kernel model.
//!
//! Every host object lives behind one kernel-wide `Mutex`; each thread parks
//! on its own `Condvar` paired with that mutex.

pub use parking_lot::{Condvar, Mutex, MutexGuard};
pub use std::sync::{Arc, Weak};
