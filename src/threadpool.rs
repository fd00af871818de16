//! Process-wide worker pool handed to every kernel call.
//!
//! The pool is created lazily by the first operator run and lives until the
//! process exits. It is never torn down.

use std::env;
use std::sync::{Arc, Mutex, OnceLock};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backends::nnp::KernelLibrary;
use crate::common::errors::check_status;
use crate::common::types::HResult;

const THREAD_COUNT_VARS: [&str; 2] = ["MKL_NUM_THREADS", "OMP_NUM_THREADS"];

static SHARED_POOL: OnceLock<Arc<ThreadPool>> = OnceLock::new();
static POOL_INIT: Mutex<()> = Mutex::new(());

fn parse_thread_count(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|&n| n > 0)
}

/// Number of workers the host asks numeric libraries to use.
///
/// Honours `MKL_NUM_THREADS` then `OMP_NUM_THREADS`, falling back to the
/// number of logical cores.
pub fn host_thread_count() -> usize {
    THREAD_COUNT_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find_map(|value| parse_thread_count(&value))
        .unwrap_or_else(num_cpus::get)
}

/// Returns the shared pool, creating it on first use.
///
/// The first call initializes `library` and sizes the pool with
/// `host_thread_count()`. Concurrent first calls are serialized so that only
/// one pool is ever built; once it exists the lookup takes no lock. A failed
/// initialization leaves nothing behind and the next call tries again.
pub fn shared_pool(library: &dyn KernelLibrary) -> HResult<Arc<ThreadPool>> {
    if let Some(pool) = SHARED_POOL.get() {
        return Ok(Arc::clone(pool));
    }

    let _guard = POOL_INIT
        .lock()
        .map_err(|_| format_err!("Shared thread pool lock is poisoned"))?;
    // another caller may have finished while we waited for the lock
    if let Some(pool) = SHARED_POOL.get() {
        return Ok(Arc::clone(pool));
    }

    check_status("initialize", library.initialize())?;
    let num_threads = host_thread_count();
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("nnp-worker-{}", i))
        .build()?;
    info!("Created shared kernel thread pool with {} threads", num_threads);

    Ok(Arc::clone(SHARED_POOL.get_or_init(|| Arc::new(pool))))
}
