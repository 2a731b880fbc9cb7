//! Internal storage helpers.

use crate::error::{Result, ScopeError};
use crate::key::ServiceKey;
use crate::registry::Reuse;
use crate::resolver::Resolver;
use fnv::FnvHashMap;
use log::trace;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// A type-erased, shared instance of a service or singleton value.
pub type SharedAny = Arc<dyn Any + Send + Sync>;

/// A type-erased constructor of a service.
pub(crate) type Factory = Arc<dyn Fn(&Resolver) -> Result<SharedAny> + Send + Sync>;

/// A type-erased dispose hook, called with the instance the constructor
/// returned.
pub(crate) type Disposer = Arc<dyn Fn(&(dyn Any + Send + Sync)) + Send + Sync>;

///////////////////////////////////////////////////////////////////////////////
// Registrations
///////////////////////////////////////////////////////////////////////////////

/// How instances of a registration are obtained.
#[derive(Clone)]
pub(crate) enum Activator {
    /// Constructed by the container.
    Factory(Factory),
    /// Supplied at registration time. Never constructed nor disposed.
    Instance(SharedAny),
}

/// A service registration that is type erased.
#[derive(Clone)]
pub(crate) struct Registration {
    pub key: ServiceKey,
    pub reuse: Reuse,
    pub activator: Activator,
    pub disposer: Option<Disposer>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("reuse", &self.reuse)
            .field("instance", &matches!(self.activator, Activator::Instance(..)))
            .field("disposer", &self.disposer.is_some())
            .finish()
    }
}

///////////////////////////////////////////////////////////////////////////////
// Instance Cache
///////////////////////////////////////////////////////////////////////////////

/// Who owns an instance cache. Decides the error after disposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOwner {
    Root,
    Scope(u64),
}

/// An instance whose dispose hook runs when its owner is disposed.
pub(crate) struct TrackedInstance {
    key: ServiceKey,
    instance: SharedAny,
    disposer: Disposer,
}

/// The instances created by a scope or by the root of the factory.
pub(crate) struct InstanceCache {
    owner: CacheOwner,
    disposed: bool,
    /// Instances that are reused within the owner.
    instances: FnvHashMap<ServiceKey, SharedAny>,
    /// Instances to dispose, in creation order.
    tracked: Vec<TrackedInstance>,
    /// Services that are currently being constructed, per thread.
    resolving: Vec<(ThreadId, ServiceKey)>,
}

impl InstanceCache {
    pub fn new(owner: CacheOwner) -> Self {
        Self {
            owner,
            disposed: false,
            instances: FnvHashMap::default(),
            tracked: Vec::new(),
            resolving: Vec::new(),
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The error returned by every operation after disposal.
    pub fn closed_error(&self) -> ScopeError {
        match self.owner {
            CacheOwner::Root => ScopeError::FactoryDisposed,
            CacheOwner::Scope(..) => ScopeError::ScopeDisposed,
        }
    }

    pub fn ensure_alive(&self) -> Result<()> {
        if self.disposed {
            Err(self.closed_error())
        } else {
            Ok(())
        }
    }

    /// Marks `key` as under construction by the current thread.
    fn enter(&mut self, key: ServiceKey) -> Result<()> {
        let current = thread::current().id();
        if self.resolving.contains(&(current, key)) {
            let chain = self
                .resolving
                .iter()
                .filter(|(t, _)| *t == current)
                .map(|(_, k)| k.name())
                .chain(std::iter::once(key.name()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ScopeError::CircularDependency(chain));
        }
        self.resolving.push((current, key));
        Ok(())
    }

    fn leave(&mut self, key: ServiceKey) {
        let entry = (thread::current().id(), key);
        if let Some(pos) = self.resolving.iter().rposition(|e| *e == entry) {
            self.resolving.remove(pos);
        }
    }

    /// Marks the cache as disposed and hands out the tracked instances.
    ///
    /// Returns `None` if the cache was already disposed.
    pub fn close(&mut self) -> Option<Vec<TrackedInstance>> {
        if self.disposed {
            return None;
        }
        self.disposed = true;
        self.instances.clear();
        self.resolving.clear();
        Some(std::mem::take(&mut self.tracked))
    }

    #[cfg(test)]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }
}

/// Runs the dispose hooks in reverse creation order.
///
/// Must be called without holding the lock of the cache the instances came
/// from.
pub(crate) fn dispose_all(owner: CacheOwner, tracked: Vec<TrackedInstance>) {
    for item in tracked.into_iter().rev() {
        trace!("Disposing {} ({:?})", item.key.name(), owner);
        (item.disposer)(&*item.instance);
    }
}

/// Marks a service as under construction until dropped, also when the
/// constructor unwinds.
struct Resolving<'a> {
    cache: &'a Mutex<InstanceCache>,
    key: ServiceKey,
}

impl Drop for Resolving<'_> {
    fn drop(&mut self) {
        self.cache.lock().leave(self.key);
    }
}

/// Returns an instance of `registration`, constructing it if it is not cached.
///
/// The lock is released while the constructor runs, so the constructor can
/// resolve its own dependencies through `resolver`.
pub(crate) fn activate(
    cache: &Mutex<InstanceCache>,
    registration: &Registration,
    resolver: &Resolver,
) -> Result<SharedAny> {
    let factory = match &registration.activator {
        Activator::Instance(instance) => return Ok(instance.clone()),
        Activator::Factory(factory) => factory,
    };

    let key = registration.key;
    let reuse_cached = registration.reuse != Reuse::Transient;

    {
        let mut guard = cache.lock();
        guard.ensure_alive()?;
        if reuse_cached {
            if let Some(instance) = guard.instances.get(&key) {
                return Ok(instance.clone());
            }
        }
        guard.enter(key)?;
    }

    let result = {
        let _resolving = Resolving { cache, key };
        trace!("Constructing {} ({:?})", key.name(), registration.reuse);
        factory(resolver)
    };
    let instance = result?;

    let mut guard = cache.lock();

    // The owner was disposed while the constructor ran.
    if guard.disposed {
        let err = guard.closed_error();
        drop(guard);
        if let Some(disposer) = &registration.disposer {
            disposer(&*instance);
        }
        return Err(err);
    }

    if reuse_cached {
        if let Some(existing) = guard.instances.get(&key) {
            let existing = existing.clone();
            drop(guard);
            if let Some(disposer) = &registration.disposer {
                disposer(&*instance);
            }
            return Ok(existing);
        }
        guard.instances.insert(key, instance.clone());
    }

    // Transients resolved at the root are owned by the caller and never
    // disposed.
    let track = reuse_cached || guard.owner != CacheOwner::Root;
    if let Some(disposer) = registration.disposer.as_ref().filter(|_| track) {
        guard.tracked.push(TrackedInstance {
            key,
            instance: instance.clone(),
            disposer: disposer.clone(),
        });
    }

    Ok(instance)
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registration(reuse: Reuse, counter: Arc<AtomicUsize>) -> Registration {
        let factory: Factory = Arc::new(|_: &Resolver| {
            let instance: SharedAny = Arc::new(7u32);
            Ok(instance)
        });
        let disposer: Disposer = Arc::new(move |_: &(dyn Any + Send + Sync)| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        Registration {
            key: ServiceKey::of::<u32>(),
            reuse,
            activator: Activator::Factory(factory),
            disposer: Some(disposer),
        }
    }

    #[test]
    fn scoped_instances_are_cached() {
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Scope(1)));
        let reg = registration(Reuse::Scoped, Arc::new(AtomicUsize::new(0)));
        let resolver = Resolver::detached();

        let a = activate(&cache, &reg, &resolver).unwrap();
        let b = activate(&cache, &reg, &resolver).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.lock().tracked_len(), 1);
    }

    #[test]
    fn transient_instances_are_tracked_each() {
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Scope(1)));
        let reg = registration(Reuse::Transient, Arc::new(AtomicUsize::new(0)));
        let resolver = Resolver::detached();

        let a = activate(&cache, &reg, &resolver).unwrap();
        let b = activate(&cache, &reg, &resolver).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.lock().tracked_len(), 2);
    }

    #[test]
    fn root_transients_are_not_tracked() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Root));
        let reg = registration(Reuse::Transient, counter.clone());

        let first = activate(&cache, &reg, &Resolver::detached()).unwrap();
        let weak = Arc::downgrade(&first);
        drop(first);
        activate(&cache, &reg, &Resolver::detached()).unwrap();

        assert!(weak.upgrade().is_none());
        assert_eq!(cache.lock().tracked_len(), 0);
        let tracked = cache.lock().close().unwrap();
        dispose_all(CacheOwner::Root, tracked);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_constructor_leaves_resolving() {
        let factory: Factory = Arc::new(|_: &Resolver| -> Result<SharedAny> {
            panic!("constructor failed");
        });
        let reg = Registration {
            key: ServiceKey::of::<u32>(),
            reuse: Reuse::Singleton,
            activator: Activator::Factory(factory),
            disposer: None,
        };
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Root));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            activate(&cache, &reg, &Resolver::detached())
        }));

        assert!(result.is_err());
        assert!(cache.lock().resolving.is_empty());
    }

    #[test]
    fn close_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Root));
        let reg = registration(Reuse::Singleton, counter.clone());
        activate(&cache, &reg, &Resolver::detached()).unwrap();

        let tracked = cache.lock().close().unwrap();
        dispose_all(CacheOwner::Root, tracked);
        assert!(cache.lock().close().is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_cache_rejects_activation() {
        let cache = Mutex::new(InstanceCache::new(CacheOwner::Root));
        cache.lock().close();
        let reg = registration(Reuse::Singleton, Arc::new(AtomicUsize::new(0)));
        let result = activate(&cache, &reg, &Resolver::detached());
        assert!(matches!(result, Err(ScopeError::FactoryDisposed)));
    }

    #[test]
    fn enter_twice_is_circular() {
        let mut cache = InstanceCache::new(CacheOwner::Scope(3));
        cache.enter(ServiceKey::of::<u8>()).unwrap();
        cache.enter(ServiceKey::of::<u16>()).unwrap();
        let err = cache.enter(ServiceKey::of::<u8>()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "circular dependency detected: u8 -> u16 -> u8"
        );
    }
}
