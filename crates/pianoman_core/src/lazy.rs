//! A lazily computed value that can be invalidated.

use parking_lot::Mutex;
use std::fmt;

type Callback = Box<dyn Fn() + Send + Sync>;

/// A cached value computed on first use.
///
/// Invalidating the value clears it and runs the cleanup callback; the next
/// [`get_or_try_init`](Self::get_or_try_init) computes it again.
pub struct LazyValue<T> {
    value: Mutex<Option<T>>,
    on_invalidate: Option<Callback>,
}

impl<T: Clone> LazyValue<T> {
    /// Creates an empty value.
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            on_invalidate: None,
        }
    }

    /// Creates an empty value that runs `callback` when invalidated.
    pub fn with_invalidate_callback(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            value: Mutex::new(None),
            on_invalidate: Some(Box::new(callback)),
        }
    }

    /// Returns the current value without computing it.
    pub fn get(&self) -> Option<T> {
        self.value.lock().clone()
    }

    /// Seeds the value.
    pub fn set(&self, value: T) {
        *self.value.lock() = Some(value);
    }

    /// Returns the value, computing it with `init` if it is not populated.
    ///
    /// The lock is not held while `init` runs, so `init` may call back into
    /// this value. If `init` fails the value stays empty.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`.
    pub fn get_or_try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let value = init()?;

        let mut slot = self.value.lock();
        Ok(slot.get_or_insert(value).clone())
    }

    /// Clears the value and runs the invalidation callback.
    pub fn invalidate(&self) {
        self.value.lock().take();

        if let Some(callback) = &self.on_invalidate {
            callback();
        }
    }
}

impl<T: Clone> Default for LazyValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("populated", &self.value.lock().is_some())
            .field("has_callback", &self.on_invalidate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn computes_once() {
        let calls = AtomicUsize::new(0);
        let lazy = LazyValue::new();

        for _ in 0..3 {
            let value = lazy
                .get_or_try_init(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(42)
                })
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_init_leaves_value_empty() {
        let lazy: LazyValue<u32> = LazyValue::new();
        assert_eq!(lazy.get_or_try_init(|| Err("nope")), Err("nope"));
        assert_eq!(lazy.get(), None);
        assert_eq!(lazy.get_or_try_init(|| Ok::<_, ()>(7)), Ok(7));
    }

    #[test]
    fn set_skips_init() {
        let lazy = LazyValue::new();
        lazy.set("cached".to_string());

        let value = lazy
            .get_or_try_init(|| -> Result<String, ()> { panic!("should not run") })
            .unwrap();
        assert_eq!(value, "cached");
    }

    #[test]
    fn invalidate_runs_callback_and_recomputes() {
        let invalidations = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invalidations);
        let lazy = LazyValue::with_invalidate_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        lazy.set(1);
        lazy.invalidate();
        assert_eq!(lazy.get(), None);
        assert_eq!(invalidations.load(Ordering::SeqCst), 1);

        assert_eq!(lazy.get_or_try_init(|| Ok::<_, ()>(2)), Ok(2));
        assert_eq!(lazy.get(), Some(2));
    }

    #[test]
    fn init_may_reenter() {
        let lazy = LazyValue::new();
        let value = lazy
            .get_or_try_init(|| {
                lazy.invalidate();
                Ok::<_, ()>(5)
            })
            .unwrap();
        assert_eq!(value, 5);
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LazyValue<String>>();
    }
}
