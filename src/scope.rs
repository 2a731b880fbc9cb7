//! Scopes: bounded resolution contexts whose instances are released together.

use crate::container::FactoryInner;
use crate::error::Result;
use crate::getters::Shared;
use crate::internal_helpers::{activate, dispose_all, CacheOwner, InstanceCache, SharedAny};
use crate::key::ServiceKey;
use crate::registry::Reuse;
use crate::resolver::Resolver;
use crate::values::InScopeValuesHolder;
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

///////////////////////////////////////////////////////////////////////////////
// Shared State
///////////////////////////////////////////////////////////////////////////////

/// State of a scope, shared with the resolvers it hands out.
pub(crate) struct ScopeInner {
    id: u64,
    factory: Arc<FactoryInner>,
    cache: Mutex<InstanceCache>,
    values: Mutex<InScopeValuesHolder>,
}

impl ScopeInner {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.cache.lock().is_disposed()
    }

    fn ensure_alive(&self) -> Result<()> {
        self.cache.lock().ensure_alive()
    }

    /// Resolves `key` within this scope.
    pub(crate) fn resolve(self: &Arc<Self>, key: ServiceKey) -> Result<Option<SharedAny>> {
        if self.factory.is_singleton_type(key) {
            return self.get_value(key);
        }

        let registration = match self.factory.registry().get(key) {
            Some(registration) => registration,
            None => {
                self.ensure_alive()?;
                return self.factory.unresolved(key);
            }
        };

        match registration.reuse {
            Reuse::Singleton => {
                self.ensure_alive()?;
                self.factory.resolve_singleton(key).map(Some)
            }
            Reuse::Scoped | Reuse::Transient => {
                activate(&self.cache, registration, &Resolver::for_scope(self)).map(Some)
            }
        }
    }

    pub(crate) fn get_value(&self, key: ServiceKey) -> Result<Option<SharedAny>> {
        self.ensure_alive()?;
        self.values.lock().get(key)
    }

    pub(crate) fn set_value(&self, key: ServiceKey, value: Option<SharedAny>) -> Result<()> {
        self.ensure_alive()?;
        self.values.lock().set(key, value)
    }

    fn dispose(&self) {
        let tracked = self.cache.lock().close();
        if let Some(tracked) = tracked {
            debug!("Disposing scope {} ({} tracked)", self.id, tracked.len());
            dispose_all(CacheOwner::Scope(self.id), tracked);
            self.values.lock().clear();
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
// Scope Context
///////////////////////////////////////////////////////////////////////////////

/// A scope opened from a [`ScopeContextFactory`].
///
/// Services registered as [`Reuse::Scoped`] are created once per scope;
/// transient services are created on every resolution. Both are released
/// when the scope is disposed, which happens at the latest when the scope is
/// dropped.
///
/// Singleton types get their value from the scope itself: set it with
/// [`set_singleton_value`](Self::set_singleton_value) and every service of
/// this scope that resolves the type receives it.
///
/// [`ScopeContextFactory`]: crate::ScopeContextFactory
pub struct ScopeContext {
    inner: Arc<ScopeInner>,
}

impl ScopeContext {
    pub(crate) fn open(factory: Arc<FactoryInner>, id: u64) -> Self {
        debug!("Opening scope {}", id);
        let values = InScopeValuesHolder::new(factory.singleton_types().clone());
        Self {
            inner: Arc::new(ScopeInner {
                id,
                factory,
                cache: Mutex::new(InstanceCache::new(CacheOwner::Scope(id))),
                values: Mutex::new(values),
            }),
        }
    }

    /// The id of this scope, unique per factory.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns a resolver for this scope.
    pub fn resolver(&self) -> Resolver {
        Resolver::for_scope(&self.inner)
    }

    /// Resolves `T` within this scope.
    ///
    /// See [`Resolver::get`].
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Option<Shared<T>>> {
        self.resolver().get()
    }

    /// Resolves `T` within this scope, failing if there is nothing to resolve.
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Result<Shared<T>> {
        self.resolver().get_required()
    }

    /// Returns the value of singleton type `T` in this scope.
    pub fn get_singleton_value<T: Send + Sync + 'static>(&self) -> Result<Option<Shared<T>>> {
        self.inner
            .get_value(ServiceKey::of::<T>())?
            .map(Shared::<T>::from_any)
            .transpose()
    }

    /// Sets the value of singleton type `T` in this scope.
    ///
    /// Fails if `T` is not registered as a singleton type. The value is owned
    /// by the caller and is never disposed by the scope.
    pub fn set_singleton_value<T: Send + Sync + 'static>(&self, value: T) -> Result<()> {
        self.set_singleton_shared(Shared::new(Arc::new(value)))
    }

    /// Sets the value of singleton type `T` to an existing shared instance.
    pub fn set_singleton_shared<T: Send + Sync + 'static>(&self, value: Shared<T>) -> Result<()> {
        self.inner
            .set_value(ServiceKey::of::<T>(), Some(value.into_any()))
    }

    /// Removes the value of singleton type `T` from this scope.
    pub fn clear_singleton_value<T: Send + Sync + 'static>(&self) -> Result<()> {
        self.inner.set_value(ServiceKey::of::<T>(), None)
    }

    /// Returns the type-erased value stored for `key`.
    pub fn get_singleton_value_dyn(&self, key: ServiceKey) -> Result<Option<SharedAny>> {
        self.inner.get_value(key)
    }

    /// Sets the type-erased value for `key`. `None` removes the value.
    ///
    /// Fails with [`ScopeError::IncompatibleValue`] if the runtime type of
    /// the value is not the type of `key`.
    ///
    /// [`ScopeError::IncompatibleValue`]: crate::ScopeError::IncompatibleValue
    pub fn set_singleton_value_dyn(&self, key: ServiceKey, value: Option<SharedAny>) -> Result<()> {
        self.inner.set_value(key, value)
    }

    /// Disposes every instance created within this scope, in reverse creation
    /// order. Each dispose hook runs exactly once.
    ///
    /// Calling this more than once has no effect. After disposal, every
    /// operation on the scope fails with `ScopeError::ScopeDisposed`.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns true if the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl Drop for ScopeContext {
    fn drop(&mut self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeContext")
            .field("id", &self.inner.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////
