// SPDX-License-Identifier: MPL-2.0

//! Process-wide Tokio runtime for embedders without one.
//!
//! UI toolkits usually own the main thread and call in synchronously. They
//! drive the data core through [`block_on`] and [`spawn`] so the streak
//! watcher and network calls all share one small pool.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;

/// Network I/O and the streak watcher are all the pool ever runs
const WORKERS: usize = 2;

const THREAD_NAME: &str = "flashdeck-async";

static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    Builder::new_multi_thread()
        .worker_threads(WORKERS)
        .thread_name(THREAD_NAME)
        .enable_all()
        .build()
        .expect("failed to create async runtime")
});

/// Run `future` to completion on the shared runtime.
/// Must not be called from inside another runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}

/// Run `future` in the background on the shared runtime
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    RUNTIME.spawn(future)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_work_runs_on_the_shared_pool() {
        let handle = spawn(async {
            std::thread::current()
                .name()
                .map(str::to_string)
                .unwrap_or_default()
        });
        let thread = block_on(handle).unwrap();
        assert_eq!(thread, THREAD_NAME);
    }
}
