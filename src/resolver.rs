//! Resolver handed to services.

use crate::container::FactoryInner;
use crate::error::{Result, ScopeError};
use crate::getters::Shared;
use crate::internal_helpers::SharedAny;
use crate::key::ServiceKey;
use crate::scope::ScopeInner;
use std::fmt;
use std::sync::{Arc, Weak};

#[derive(Clone)]
enum Target {
    Scope(Weak<ScopeInner>),
    Root(Weak<FactoryInner>),
}

/// Used to resolve services from the scope that constructed a service.
///
/// Every constructor receives a resolver. It can be cloned and stored, so a
/// service can look up other services later on; within one scope this
/// returns the same instances as the scope itself.
///
/// A resolver only holds a weak reference. It does not keep its scope alive
/// and fails with [`ScopeError::ScopeDisposed`] once the scope is gone.
/// Singletons receive a resolver for the root of the factory, which cannot
/// resolve scoped services.
#[derive(Clone)]
pub struct Resolver {
    target: Target,
}

impl Resolver {
    /// Creates a resolver for a scope.
    ///
    /// It's important that this is `pub(crate)`: only the scope hands out
    /// resolvers for itself.
    pub(crate) fn for_scope(scope: &Arc<ScopeInner>) -> Self {
        Self {
            target: Target::Scope(Arc::downgrade(scope)),
        }
    }

    /// Creates a resolver for the root of a factory.
    pub(crate) fn for_root(factory: &Arc<FactoryInner>) -> Self {
        Self {
            target: Target::Root(Arc::downgrade(factory)),
        }
    }

    /// A resolver that is not attached to anything.
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            target: Target::Root(Weak::new()),
        }
    }

    /// Resolves `T`.
    ///
    /// Returns `Ok(None)` if the type is a singleton type without a value in
    /// the scope, or if the type is not registered and the factory is
    /// configured with [`IfUnresolved::ReturnDefault`].
    ///
    /// [`IfUnresolved::ReturnDefault`]: crate::IfUnresolved::ReturnDefault
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Option<Shared<T>>> {
        self.resolve(ServiceKey::of::<T>())?
            .map(Shared::<T>::from_any)
            .transpose()
    }

    /// Resolves `T`, failing if there is nothing to resolve.
    pub fn get_required<T: Send + Sync + 'static>(&self) -> Result<Shared<T>> {
        self.get::<T>()?
            .ok_or_else(|| ScopeError::Unresolved(ServiceKey::of::<T>().name()))
    }

    /// Resolves a type-erased instance.
    pub fn resolve(&self, key: ServiceKey) -> Result<Option<SharedAny>> {
        match &self.target {
            Target::Scope(scope) => scope
                .upgrade()
                .ok_or(ScopeError::ScopeDisposed)?
                .resolve(key),
            Target::Root(factory) => factory
                .upgrade()
                .ok_or(ScopeError::FactoryDisposed)?
                .resolve_root(key),
        }
    }

    /// The id of the scope this resolver belongs to, or `None` for a root
    /// resolver.
    pub fn scope_id(&self) -> Option<u64> {
        match &self.target {
            Target::Scope(scope) => scope.upgrade().map(|s| s.id()),
            Target::Root(..) => None,
        }
    }

    /// Returns true if the scope (or factory) behind this resolver is still
    /// usable.
    pub fn is_alive(&self) -> bool {
        match &self.target {
            Target::Scope(scope) => scope.upgrade().map_or(false, |s| !s.is_disposed()),
            Target::Root(factory) => factory.upgrade().map_or(false, |f| !f.is_disposed()),
        }
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Scope(..) => f
                .debug_struct("Resolver")
                .field("scope", &self.scope_id())
                .finish(),
            Target::Root(..) => f.debug_struct("Resolver").field("scope", &"root").finish(),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_resolver_fails() {
        let resolver = Resolver::detached();
        assert!(matches!(
            resolver.get::<u32>(),
            Err(ScopeError::FactoryDisposed)
        ));
        assert!(!resolver.is_alive());
        assert_eq!(resolver.scope_id(), None);
    }
}
