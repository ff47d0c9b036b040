use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use super::matcher::Matcher;
use super::scanner::{scan_range, HalfScan, ScanJob};
use super::walker::walk;
use crate::filters::Filters;
use crate::store::SharedStore;

/// Counting semaphore. The pipeline's handoff protocol is expressed with
/// semaphore waits; std offers Mutex + Condvar to build one from.
struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
    }

    fn post(&self) {
        *self.count.lock().unwrap() += 1;
        self.available.notify_one();
    }
}

/// The single-file handoff region. `slot` holds the current file while the
/// two workers scan its halves; `None` in the slot is the poison pill that
/// shuts the workers and the consumer down. The semaphore chain guarantees
/// exclusive stages: producer fills, workers read, consumer drains.
struct Shared {
    matcher: Matcher,
    slot: Mutex<Option<Arc<ScanJob>>>,
    slot_free: Semaphore,
    work_ready: [Semaphore; 2],
    work_done: [Semaphore; 2],
    results: [Mutex<Option<HalfScan>>; 2],
    store: SharedStore,
    shutdown: AtomicBool,
}

/// The running search pipeline: walker producer, two half-file scan
/// workers, and a consumer merging into the shared store.
pub struct Engine {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the pipeline threads and start walking. Results stream into
    /// `store`; its `done` flag is set once every match has been merged.
    pub fn start(
        root: PathBuf,
        matcher: Matcher,
        filters: Arc<Filters>,
        store: SharedStore,
    ) -> Self {
        let shared = Arc::new(Shared {
            matcher,
            slot: Mutex::new(None),
            slot_free: Semaphore::new(1),
            work_ready: [Semaphore::new(0), Semaphore::new(0)],
            work_done: [Semaphore::new(0), Semaphore::new(0)],
            results: [Mutex::new(None), Mutex::new(None)],
            store,
            shutdown: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(4);
        for id in 0..2 {
            let shared = Arc::clone(&shared);
            handles.push(spawn(&format!("scour-worker-{id}"), move || {
                worker(&shared, id)
            }));
        }
        {
            let shared = Arc::clone(&shared);
            handles.push(spawn("scour-consumer", move || consumer(&shared)));
        }
        {
            let shared = Arc::clone(&shared);
            handles.push(spawn("scour-walker", move || {
                producer(&shared, &root, &filters)
            }));
        }

        Self { shared, handles }
    }

    pub fn store(&self) -> &SharedStore {
        &self.shared.store
    }

    /// Ask every stage to wind down after the in-flight file.
    pub fn request_stop(&self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for all pipeline threads. Returns once the store is `done`.
    pub fn join(mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("pipeline thread panicked");
            }
        }
    }
}

fn spawn<F>(name: &str, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .expect("spawning pipeline thread")
}

/// Walk the tree, publishing one file at a time into the slot, then publish
/// the poison pill.
fn producer(shared: &Shared, root: &std::path::Path, filters: &Filters) {
    walk(root, filters, &shared.shutdown, |path| {
        shared.slot_free.acquire();
        let job = match ScanJob::open(path) {
            Some(job) => Arc::new(job),
            None => {
                // nothing to scan; release the slot for the next file
                shared.slot_free.post();
                return;
            }
        };
        *shared.slot.lock().unwrap() = Some(job);
        shared.work_ready[0].post();
        shared.work_ready[1].post();
    });

    shared.slot_free.acquire();
    debug_assert!(shared.slot.lock().unwrap().is_none());
    shared.work_ready[0].post();
    shared.work_ready[1].post();
    debug!("walk finished");
}

/// Scan one half of each published file until the pill arrives.
fn worker(shared: &Shared, id: usize) {
    loop {
        shared.work_ready[id].acquire();
        let job = shared.slot.lock().unwrap().clone();
        let job = match job {
            Some(job) => job,
            None => {
                shared.work_done[id].post();
                return;
            }
        };
        let half = if id == 0 {
            job.first_half()
        } else {
            job.second_half()
        };
        let scan = scan_range(&shared.matcher, half);
        *shared.results[id].lock().unwrap() = Some(scan);
        shared.work_done[id].post();
    }
}

/// Merge both workers' output into the store, one critical section per
/// file, then free the slot. Seeing the pill marks the store done.
fn consumer(shared: &Shared) {
    loop {
        shared.work_done[0].acquire();
        shared.work_done[1].acquire();

        let job = shared.slot.lock().unwrap().take();
        let job = match job {
            Some(job) => job,
            None => {
                shared.store.lock().unwrap().set_done();
                debug!("scan complete");
                return;
            }
        };

        let first = shared.results[0].lock().unwrap().take().unwrap_or_default();
        let second = shared.results[1].lock().unwrap().take().unwrap_or_default();

        if !first.matches.is_empty() || !second.matches.is_empty() {
            let mut store = shared.store.lock().unwrap();
            store.push_file(job.path.to_string_lossy().into_owned());
            for m in first.matches {
                store.push_line(m.number, m.text);
            }
            for m in second.matches {
                store.push_line(m.number + first.lines, m.text);
            }
        }

        // the file is unmapped once the last reference drops
        drop(job);
        shared.slot_free.post();
    }
}
