//! Observable Implementation
//!
//! An [`Observable`] holds a value and notifies its listeners whenever the
//! value changes.
//!
//! # How Observables Work
//!
//! 1. `set` stores the new value, then calls every listener with the old and
//!    new value. A listener that calls `read` sees the new value.
//!
//! 2. Writing a value equal to the current one is not a change and issues no
//!    notification.
//!
//! 3. Listeners run outside every internal lock, so a listener may read,
//!    write, subscribe or unsubscribe without deadlocking.
//!
//! # Derivations
//!
//! `map` derives a read-only observable; `property` derives a read-write
//! projection of one part of the value. Writing through a projection writes
//! the source, so the source's listeners are notified exactly as for a
//! direct write. Closing a source closes all of its derivations, and
//! dropping a derivation detaches it from its source.
//!
//! # Thread Safety
//!
//! The value sits behind an `RwLock`; listeners, the closed flag and close
//! hooks share one `Mutex`, so a subscription can never slip in after close.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use super::handle::ListenerHandle;
use crate::error::{CloseReason, ObservableError};

/// Counter for generating unique observable IDs.
static OBSERVABLE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_observable_id() -> u64 {
    OBSERVABLE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

type Listener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;
type Writer<T> = Box<dyn Fn(T) -> Result<(), ObservableError> + Send + Sync>;
type CloseHook = Box<dyn FnOnce(&CloseReason) + Send>;

/// How writes reach the value.
enum Access<T> {
    /// Writes replace the stored value.
    Writable,
    /// Writes are rejected.
    ReadOnly,
    /// Writes go to the source of a projection.
    Projected(Writer<T>),
}

/// Listener registry and lifecycle, guarded together.
struct Registry<T> {
    listeners: IndexMap<ListenerHandle, Listener<T>>,
    closed: Option<CloseReason>,
    close_hooks: IndexMap<ListenerHandle, CloseHook>,
}

struct Inner<T> {
    id: u64,
    value: RwLock<T>,
    registry: Mutex<Registry<T>>,
    access: Access<T>,
    /// Detaches a derivation from its source.
    upstream: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(detach) = self.upstream.get_mut().take() {
            detach();
        }
    }
}

/// A value that notifies listeners when it changes.
///
/// # Example
///
/// ```rust
/// use reflow_core::reactive::Observable;
///
/// let animal = Observable::new("dog".to_string());
/// let handle = animal
///     .subscribe(|old, new| println!("{old} -> {new}"))
///     .unwrap();
///
/// animal.set("cat".to_string()).unwrap();
/// assert_eq!(animal.read(), "cat");
///
/// animal.unsubscribe(handle);
/// ```
pub struct Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    inner: Arc<Inner<T>>,
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create a new writable observable.
    pub fn new(value: T) -> Self {
        Self::with_access(value, Access::Writable)
    }

    fn with_access(value: T, access: Access<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: next_observable_id(),
                value: RwLock::new(value),
                registry: Mutex::new(Registry {
                    listeners: IndexMap::new(),
                    closed: None,
                    close_hooks: IndexMap::new(),
                }),
                access,
                upstream: Mutex::new(None),
            }),
        }
    }

    /// Get the observable's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get a clone of the current value.
    pub fn read(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Borrow the current value.
    ///
    /// `f` runs under the read lock; it must not write to this observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Set a new value and notify listeners if it differs from the current one.
    pub fn set(&self, value: T) -> Result<(), ObservableError> {
        self.ensure_open()?;
        match &self.inner.access {
            Access::Writable => {
                self.apply(value);
                Ok(())
            }
            Access::ReadOnly => Err(ObservableError::ReadOnly),
            Access::Projected(write) => write(value),
        }
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> Result<(), ObservableError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.inner.value.read();
            f(&guard)
        };
        self.set(next)
    }

    /// Register a listener called with `(old, new)` on every change.
    pub fn subscribe<F>(&self, listener: F) -> Result<ListenerHandle, ObservableError>
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let mut registry = self.inner.registry.lock();
        if let Some(reason) = &registry.closed {
            return Err(ObservableError::Closed {
                reason: reason.clone(),
            });
        }
        let handle = ListenerHandle::new();
        registry.listeners.insert(handle, Arc::new(listener));
        Ok(handle)
    }

    /// Remove a listener. Returns whether it was still subscribed.
    pub fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let removed = self.inner.registry.lock().listeners.shift_remove(&handle);
        removed.is_some()
    }

    /// Get the number of active listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.lock().listeners.len()
    }

    /// Close the value: detach every listener, reject further writes and
    /// subscriptions, and close every derivation. A closed derivation also
    /// stops following its source. Closing twice is a no-op.
    pub fn close(&self, reason: CloseReason) {
        let (listeners, hooks) = {
            let mut registry = self.inner.registry.lock();
            if registry.closed.is_some() {
                return;
            }
            registry.closed = Some(reason.clone());
            (
                std::mem::take(&mut registry.listeners),
                std::mem::take(&mut registry.close_hooks),
            )
        };
        // Listeners may own derivations of this value; drop them unlocked.
        drop(listeners);

        let upstream = self.inner.upstream.lock().take();
        if let Some(detach) = upstream {
            detach();
        }

        debug!(observable = self.inner.id, %reason, "observable closed");
        for (_, hook) in hooks {
            hook(&reason);
        }
    }

    /// Whether the value has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.registry.lock().closed.is_some()
    }

    /// The reason given to `close`, if closed.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.inner.registry.lock().closed.clone()
    }

    /// Run `hook` when the value is closed, or now if it already is.
    pub fn on_close<F>(&self, hook: F)
    where
        F: FnOnce(&CloseReason) + Send + 'static,
    {
        self.add_close_hook(hook);
    }

    /// Register a close hook. Returns its handle, or `None` when the value
    /// was already closed and the hook ran immediately.
    fn add_close_hook<F>(&self, hook: F) -> Option<ListenerHandle>
    where
        F: FnOnce(&CloseReason) + Send + 'static,
    {
        let mut registry = self.inner.registry.lock();
        match registry.closed.clone() {
            Some(reason) => {
                drop(registry);
                hook(&reason);
                None
            }
            None => {
                let handle = ListenerHandle::new();
                registry.close_hooks.insert(handle, Box::new(hook));
                Some(handle)
            }
        }
    }

    fn remove_close_hook(&self, handle: ListenerHandle) {
        let removed = self.inner.registry.lock().close_hooks.shift_remove(&handle);
        drop(removed);
    }

    /// Derive a read-only observable that follows this one.
    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let initial = self.with(&f);
        self.derive(initial, Access::ReadOnly, f)
    }

    /// Derive a read-write projection of one part of this value.
    ///
    /// `get` extracts the part; `put` writes it back into a copy of the
    /// source value, which is then set on the source.
    ///
    /// ```rust
    /// use reflow_core::reactive::Observable;
    ///
    /// #[derive(Clone, PartialEq)]
    /// struct Pet { name: String }
    ///
    /// let pet = Observable::new(Pet { name: "dog".into() });
    /// let name = pet.property(|p| p.name.clone(), |p, name| p.name = name);
    ///
    /// name.set("cat".into()).unwrap();
    /// assert_eq!(pet.read().name, "cat");
    /// ```
    pub fn property<U, G, P>(&self, get: G, put: P) -> Observable<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        G: Fn(&T) -> U + Send + Sync + 'static,
        P: Fn(&mut T, U) + Send + Sync + 'static,
    {
        let source = self.clone();
        let write: Writer<U> = Box::new(move |value: U| {
            source.update(|current| {
                let mut next = current.clone();
                put(&mut next, value);
                next
            })
        });
        let initial = self.with(&get);
        self.derive(initial, Access::Projected(write), get)
    }

    fn derive<U, F>(&self, initial: U, access: Access<U>, project: F) -> Observable<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let derived = Observable::with_access(initial, access);

        let weak = Arc::downgrade(&derived.inner);
        let subscribed = self.subscribe(move |_, new| {
            if let Some(inner) = weak.upgrade() {
                Observable { inner }.apply(project(new));
            }
        });

        match subscribed {
            Ok(handle) => {
                let weak = Arc::downgrade(&derived.inner);
                let hook = self.add_close_hook(move |reason| {
                    if let Some(inner) = weak.upgrade() {
                        Observable { inner }.close(reason.clone());
                    }
                });

                let source = self.clone();
                *derived.inner.upstream.lock() = Some(Box::new(move || {
                    source.unsubscribe(handle);
                    if let Some(hook) = hook {
                        source.remove_close_hook(hook);
                    }
                }));
            }
            Err(_) => {
                let reason = self
                    .close_reason()
                    .unwrap_or_else(|| CloseReason::new("source was closed"));
                derived.close(reason);
            }
        }

        derived
    }

    fn ensure_open(&self) -> Result<(), ObservableError> {
        match &self.inner.registry.lock().closed {
            Some(reason) => Err(ObservableError::Closed {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Store `value` and notify listeners, unless it equals the current value.
    fn apply(&self, value: T) {
        if self.inner.registry.lock().closed.is_some() {
            return;
        }
        let old = {
            let mut guard = self.inner.value.write();
            if *guard == value {
                return;
            }
            std::mem::replace(&mut *guard, value.clone())
        };
        self.notify(&old, &value);
    }

    fn notify(&self, old: &T, new: &T) {
        let listeners: Vec<Listener<T>> = self
            .inner
            .registry
            .lock()
            .listeners
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(old, new);
        }
    }
}

impl<T> Clone for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &self.read())
            .field("subscriber_count", &self.subscriber_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
