//! Single background worker performing full-path lookups against the lower
//! namespace on behalf of callers that must not do so directly (mount-time
//! lower-root resolution).

use alloc::collections::vec_deque::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use core::pin::pin;
use core::sync::atomic::{AtomicBool, Ordering};

use eonix_log::println_warn;
use eonix_runtime::scheduler::RUNTIME;
use eonix_sync::{LazyLock, Spin, WaitList};

use crate::kernel::constants::EIO;
use crate::kernel::vfs::dentry::Dentry;
use crate::kernel::vfs::FsContext;
use crate::path::Path;
use crate::prelude::KResult;

struct Request {
    path: String,
    result: Spin<Option<KResult<Arc<Dentry>>>>,
    done: WaitList,
}

struct Worker {
    queue: Spin<VecDeque<Arc<Request>>>,
    wake: WaitList,
    zombie: AtomicBool,
}

static WORKER: LazyLock<Arc<Worker>> = LazyLock::new(|| {
    Arc::new(Worker {
        queue: Spin::new(VecDeque::new()),
        wake: WaitList::new(),
        zombie: AtomicBool::new(false),
    })
});

impl Worker {
    async fn run(self: Arc<Self>) {
        loop {
            let request = loop {
                if let Some(request) = self.queue.lock().pop_front() {
                    break Some(request);
                }

                if self.zombie.load(Ordering::Acquire) {
                    break None;
                }

                let mut wait = pin!(self.wake.prepare_to_wait());
                wait.as_mut().add_to_wait_list();
                wait.await;
            };

            let Some(request) = request else {
                self.drain_as_zombie();
                return;
            };

            let path = Path::new(request.path.as_bytes());
            let outcome = match path {
                Ok(path) => Dentry::open(FsContext::global(), path, true).await,
                Err(err) => Err(err),
            };

            *request.result.lock() = Some(outcome);
            request.done.notify_all();
        }
    }

    fn drain_as_zombie(&self) {
        let mut queue = self.queue.lock();
        while let Some(request) = queue.pop_front() {
            *request.result.lock() = Some(Err(EIO));
            request.done.notify_all();
        }
    }
}

/// Start the single automount worker task. Idempotent: calling this more
/// than once just spawns an extra idle worker, which is harmless but
/// pointless, so callers should only call it once from module init.
pub fn start() {
    RUNTIME.spawn(Worker::run(WORKER.clone()));
}

/// Signal the worker to drain its queue as zombies and exit. Not currently
/// invoked by any boot/shutdown path in this kernel (there is no module
/// teardown sequence to hook into yet), kept for contract completeness.
#[allow(dead_code)]
pub fn stop() {
    WORKER.zombie.store(true, Ordering::Release);
    WORKER.wake.notify_one();
}

/// Resolve `path` (an absolute path string) against the lower namespace via
/// the single automount-capable worker, waiting for it to complete.
pub async fn resolve(path: &[u8]) -> KResult<Arc<Dentry>> {
    if WORKER.zombie.load(Ordering::Acquire) {
        println_warn!("lofs: automount request submitted after worker shutdown");
        return Err(EIO);
    }

    let request = Arc::new(Request {
        path: String::from_utf8_lossy(path).into_owned(),
        result: Spin::new(None),
        done: WaitList::new(),
    });

    WORKER.queue.lock().push_back(request.clone());
    WORKER.wake.notify_one();

    if request.result.lock().is_none() {
        let mut wait = pin!(request.done.prepare_to_wait());
        wait.as_mut().add_to_wait_list();
        if request.result.lock().is_none() {
            wait.await;
        }
    }

    request.result.lock().take().expect("request left unfinished")
}
