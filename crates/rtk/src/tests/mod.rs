use std::time::Duration;

use crate::ipc::ObjectId;
use crate::kernel::Kernel;

mod blocking;
mod timer;

/// Polls until `n` threads are suspended on `id`.
pub(crate) fn wait_for_waiters(kernel: &Kernel, id: ObjectId, n: usize) {
    for _ in 0..5_000 {
        if kernel.critical().waiter_count(id) == Ok(n) {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    panic!("object {id:?} never reached {n} waiter(s)");
}
