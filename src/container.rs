//! The scope context factory, which owns the root of all scopes.

use crate::builder::FactoryBuilder;
use crate::error::{Result, ScopeError};
use crate::internal_helpers::{activate, dispose_all, CacheOwner, InstanceCache, SharedAny};
use crate::key::ServiceKey;
use crate::registry::{IfUnresolved, Reuse, ServiceRegistry};
use crate::resolver::Resolver;
use crate::scope::ScopeContext;
use crate::values::{validate_singleton_type, SingletonTypes};
use log::debug;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

///////////////////////////////////////////////////////////////////////////////
// Shared State
///////////////////////////////////////////////////////////////////////////////

/// State shared by the factory handles and every scope opened from them.
pub(crate) struct FactoryInner {
    registry: ServiceRegistry,
    singleton_types: SingletonTypes,
    if_unresolved: IfUnresolved,
    /// Singletons and transients resolved outside of a scope.
    root: Mutex<InstanceCache>,
    next_scope_id: AtomicU64,
}

impl FactoryInner {
    pub(crate) fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub(crate) fn singleton_types(&self) -> &SingletonTypes {
        &self.singleton_types
    }

    pub(crate) fn is_singleton_type(&self, key: ServiceKey) -> bool {
        self.singleton_types.contains(&key)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.root.lock().is_disposed()
    }

    /// Applies the unresolved policy to `key`.
    pub(crate) fn unresolved(&self, key: ServiceKey) -> Result<Option<SharedAny>> {
        match self.if_unresolved {
            IfUnresolved::ReturnDefault => Ok(None),
            IfUnresolved::Throw => Err(ScopeError::Unresolved(key.name())),
        }
    }

    /// Resolves a singleton from the root cache.
    pub(crate) fn resolve_singleton(self: &Arc<Self>, key: ServiceKey) -> Result<SharedAny> {
        match self.registry.get(key) {
            Some(registration) => {
                activate(&self.root, registration, &Resolver::for_root(self))
            }
            None => Err(ScopeError::Unresolved(key.name())),
        }
    }

    /// Resolves `key` outside of any scope.
    pub(crate) fn resolve_root(self: &Arc<Self>, key: ServiceKey) -> Result<Option<SharedAny>> {
        if self.is_singleton_type(key) {
            return Err(ScopeError::NoCurrentScope(key.name()));
        }

        let registration = match self.registry.get(key) {
            Some(registration) => registration,
            None => return self.unresolved(key),
        };

        if registration.reuse == Reuse::Scoped {
            return Err(ScopeError::NoCurrentScope(key.name()));
        }

        activate(&self.root, registration, &Resolver::for_root(self)).map(Some)
    }

    fn dispose(&self) {
        let tracked = self.root.lock().close();
        if let Some(tracked) = tracked {
            debug!("Disposing scope context factory ({} tracked)", tracked.len());
            dispose_all(CacheOwner::Root, tracked);
        }
    }
}

impl Drop for FactoryInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

///////////////////////////////////////////////////////////////////////////////
// Factory
///////////////////////////////////////////////////////////////////////////////

/// Opens scopes and owns the singletons shared between them.
///
/// The factory is a cheap handle; clones refer to the same registrations and
/// singletons. It lives until [`dispose`](Self::dispose) is called, or until
/// the last handle and the last scope are dropped.
#[derive(Clone)]
pub struct ScopeContextFactory {
    inner: Arc<FactoryInner>,
}

impl ScopeContextFactory {
    /// Creates a factory that is already configured by the `FactoryBuilder`.
    pub(crate) fn new_built(
        registry: ServiceRegistry,
        singleton_types: SingletonTypes,
        if_unresolved: IfUnresolved,
    ) -> Self {
        debug!(
            "Building scope context factory: {} registrations, {} singleton types",
            registry.len(),
            singleton_types.len()
        );

        Self {
            inner: Arc::new(FactoryInner {
                registry,
                singleton_types,
                if_unresolved,
                root: Mutex::new(InstanceCache::new(CacheOwner::Root)),
                next_scope_id: AtomicU64::new(1),
            }),
        }
    }

    /// Creates a `FactoryBuilder`.
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::new()
    }

    /// Opens a new scope.
    pub fn create_scope(&self) -> Result<ScopeContext> {
        self.inner.root.lock().ensure_alive()?;
        let id = self.inner.next_scope_id.fetch_add(1, Ordering::Relaxed);
        Ok(ScopeContext::open(self.inner.clone(), id))
    }

    /// Fails if `T` is not registered as a singleton type.
    pub fn validate_singleton_type<T: ?Sized + 'static>(&self) -> Result<()> {
        self.validate_singleton_key(ServiceKey::of::<T>())
    }

    /// Fails if `key` is not registered as a singleton type.
    pub fn validate_singleton_key(&self, key: ServiceKey) -> Result<()> {
        validate_singleton_type(&self.inner.singleton_types, key)
    }

    /// Returns true if `T` is registered as a singleton type.
    pub fn is_singleton_type<T: ?Sized + 'static>(&self) -> bool {
        self.inner.is_singleton_type(ServiceKey::of::<T>())
    }

    /// The registrations of this factory.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    /// The unresolved policy of this factory.
    pub fn if_unresolved(&self) -> IfUnresolved {
        self.inner.if_unresolved
    }

    /// A resolver for services that don't need a scope.
    ///
    /// Transients it resolves are not tracked: their dispose hooks never run.
    pub fn root_resolver(&self) -> Resolver {
        Resolver::for_root(&self.inner)
    }

    /// Disposes the singletons created by the factory, in reverse creation
    /// order. No scopes can be opened afterwards.
    ///
    /// Calling this more than once has no effect.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Returns true if the factory has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for ScopeContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeContextFactory")
            .field("registrations", &self.inner.registry.len())
            .field("singleton_types", &self.inner.singleton_types.len())
            .field("if_unresolved", &self.inner.if_unresolved)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////
