//! Process-wide registry of open caches
//!
//! Every [`PersistentLruCache`](crate::PersistentLruCache) registers a weak
//! reference to its state here when it is opened and deregisters when dropped.
//! The registry never keeps a cache alive.
//!
//! The first registration installs an exit hook (`atexit`) that closes, and so
//! saves, every cache still open when the process exits. This is a backstop for
//! handles that never drop, such as statics, leaked handles or code paths that
//! end in `std::process::exit`. Dropping the handle or using
//! [`PersistentLruCache::scope`](crate::PersistentLruCache::scope) is the
//! primary close path. Nothing runs on abnormal termination (signals, aborts).

use crate::Result;
use std::path::Path;
use std::sync::{Arc, Mutex, Once, PoisonError, Weak};

/// Cache state the exit hook can close
pub(crate) trait Flushable: Send {
    fn location(&self) -> &Path;
    fn is_closed(&self) -> bool;
    fn flush_and_close(&mut self) -> Result<()>;
}

struct RegistryEntry {
    id: u64,
    cache: Weak<Mutex<dyn Flushable>>,
}

struct Registry {
    next_id: u64,
    entries: Vec<RegistryEntry>,
}

lazy_static::lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry { next_id: 1, entries: Vec::new() });
}

static EXIT_HOOK: Once = Once::new();

fn registry() -> std::sync::MutexGuard<'static, Registry> {
    // Entries stay consistent even if a holder panicked
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register an open cache, returning its registry id
pub(crate) fn register(cache: &Arc<Mutex<dyn Flushable>>) -> u64 {
    EXIT_HOOK.call_once(install_exit_hook);

    let mut registry = registry();
    registry.entries.retain(|entry| entry.cache.strong_count() > 0);

    let id = registry.next_id;
    registry.next_id += 1;
    registry.entries.push(RegistryEntry { id, cache: Arc::downgrade(cache) });
    id
}

pub(crate) fn deregister(id: u64) {
    registry().entries.retain(|entry| entry.id != id);
}

fn live_caches() -> Vec<Arc<Mutex<dyn Flushable>>> {
    registry().entries.iter().filter_map(|entry| entry.cache.upgrade()).collect()
}

/// Number of registered caches that are still alive (open or closed)
pub fn open_count() -> usize {
    registry().entries.iter().filter(|entry| entry.cache.strong_count() > 0).count()
}

/// Close every registered cache that is still open. Returns how many were closed.
///
/// This is the exit hook's body. Failures are logged and do not stop the
/// remaining caches from being closed.
pub fn close_open_caches() -> usize {
    // Collect first: closing must not happen under the registry lock
    let open: Vec<_> = live_caches()
        .into_iter()
        .filter(|cache| !cache.lock().unwrap_or_else(PoisonError::into_inner).is_closed())
        .collect();

    if open.is_empty() {
        return 0;
    }
    log::warn!("closing {} open caches", open.len());

    let mut closed = 0;
    for cache in open {
        let mut state = cache.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_closed() {
            continue;
        }
        match state.flush_and_close() {
            Ok(()) => closed += 1,
            Err(e) => log::error!("failed to close cache {:?}: {}", state.location(), e),
        }
    }
    closed
}

extern "C" fn run_exit_hook() {
    // Unwinding out of an extern "C" fn aborts the process
    let _ = std::panic::catch_unwind(close_open_caches);
}

fn install_exit_hook() {
    // SAFETY: `run_exit_hook` is a plain function that never unwinds
    let rc = unsafe { libc::atexit(run_exit_hook) };
    if rc != 0 {
        log::warn!("could not install exit hook, unclosed caches will not be saved at exit");
    }
}
