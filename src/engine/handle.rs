//! Reference-counted access to a process-wide engine.
//!
//! The first [`EngineRegistry::acquire`] initialises the engine, every
//! later call while a handle is alive shares it, and dropping the last
//! [`EngineHandle`] tears it down. The next acquire initialises it again,
//! so init and teardown always come in pairs.

use std::ops::Deref;
use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

/// Slot holding a weak reference to the live engine, if any.
pub struct EngineRegistry<T> {
    slot: Mutex<Weak<T>>,
}

impl<T> EngineRegistry<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Weak::new()),
        }
    }

    /// Return a handle to the live engine, or run `init` to create one.
    ///
    /// The registry lock is held during `init`, so concurrent callers never
    /// initialise twice.
    pub fn acquire<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<EngineHandle<T>, E> {
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(live) = slot.upgrade() {
            return Ok(EngineHandle { inner: live });
        }
        debug!("initialising engine");
        let engine = Arc::new(init()?);
        *slot = Arc::downgrade(&engine);
        Ok(EngineHandle { inner: engine })
    }

    /// Number of live handles.
    pub fn active_handles(&self) -> usize {
        self.slot
            .lock()
            .map(|slot| slot.strong_count())
            .unwrap_or_else(|poisoned| poisoned.into_inner().strong_count())
    }
}

impl<T> Default for EngineRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared access to an initialised engine.
pub struct EngineHandle<T> {
    inner: Arc<T>,
}

impl<T> Clone for EngineHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for EngineHandle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}
