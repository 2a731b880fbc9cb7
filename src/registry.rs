//! Registrations of the services of an application.

use crate::error::Result;
use crate::internal_helpers::{Activator, Disposer, Factory, Registration, SharedAny};
use crate::key::ServiceKey;
use crate::resolver::Resolver;
use crate::service_traits::IService;
use fnv::FnvHashMap;
use log::debug;
use std::any::Any;
use std::sync::Arc;

///////////////////////////////////////////////////////////////////////////////
// Policies
///////////////////////////////////////////////////////////////////////////////

/// The lifetime policy applied when an instance of a registered type is
/// handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reuse {
    /// A new instance for every resolution. Disposed with the scope that
    /// resolved it. Transients resolved outside of a scope, through the root
    /// resolver or by a singleton, are owned by the caller and never disposed.
    Transient,
    /// One instance per scope, disposed with the scope.
    Scoped,
    /// One instance per factory, shared by all scopes and disposed with the
    /// factory.
    Singleton,
}

impl Default for Reuse {
    fn default() -> Self {
        Reuse::Scoped
    }
}

/// What to do when a requested type has no registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfUnresolved {
    /// Resolve to `None`.
    ReturnDefault,
    /// Fail with `ScopeError::Unresolved`.
    Throw,
}

impl Default for IfUnresolved {
    fn default() -> Self {
        IfUnresolved::ReturnDefault
    }
}

///////////////////////////////////////////////////////////////////////////////
// Registry
///////////////////////////////////////////////////////////////////////////////

/// The bindings of services to their constructors and reuse policies.
///
/// Registering a type twice replaces the earlier registration.
#[derive(Debug, Default, Clone)]
pub struct ServiceRegistry {
    services: FnvHashMap<ServiceKey, Registration>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            services: FnvHashMap::default(),
        }
    }

    /// Creates an empty registry with a specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            services: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    fn insert(&mut self, registration: Registration) -> &mut Self {
        if let Some(previous) = self.services.insert(registration.key, registration) {
            debug!("Replaced registration of {}", previous.key.name());
        }
        self
    }

    /// Registers a service that is constructed and disposed through its
    /// `IService` implementation.
    pub fn register<S: IService>(&mut self, reuse: Reuse) -> &mut Self {
        let factory: Factory = Arc::new(|resolver: &Resolver| {
            let instance: SharedAny = Arc::new(S::construct(resolver)?);
            Ok(instance)
        });
        let disposer: Disposer = Arc::new(|instance: &(dyn Any + Send + Sync)| {
            if let Some(service) = instance.downcast_ref::<S>() {
                service.dispose();
            }
        });
        self.insert(Registration {
            key: ServiceKey::of::<S>(),
            reuse,
            activator: Activator::Factory(factory),
            disposer: Some(disposer),
        })
    }

    /// Registers a custom constructor for `T`.
    ///
    /// Instances are released with their owner, but no dispose hook is run.
    pub fn register_delegate<T, F>(&mut self, reuse: Reuse, ctor: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver) -> Result<T> + Send + Sync + 'static,
    {
        self.insert(Registration {
            key: ServiceKey::of::<T>(),
            reuse,
            activator: Activator::Factory(erase_ctor(ctor)),
            disposer: None,
        })
    }

    /// Registers a custom constructor for `T` together with a dispose hook
    /// that runs when the owner of the instance is disposed.
    pub fn register_disposable_delegate<T, F, D>(
        &mut self,
        reuse: Reuse,
        ctor: F,
        dispose: D,
    ) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Resolver) -> Result<T> + Send + Sync + 'static,
        D: Fn(&T) + Send + Sync + 'static,
    {
        let disposer: Disposer = Arc::new(move |instance: &(dyn Any + Send + Sync)| {
            if let Some(instance) = instance.downcast_ref::<T>() {
                dispose(instance);
            }
        });
        self.insert(Registration {
            key: ServiceKey::of::<T>(),
            reuse,
            activator: Activator::Factory(erase_ctor(ctor)),
            disposer: Some(disposer),
        })
    }

    /// Registers an existing instance that is shared by every scope.
    ///
    /// The instance is owned by the caller; it is never disposed.
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, instance: T) -> &mut Self {
        self.insert(Registration {
            key: ServiceKey::of::<T>(),
            reuse: Reuse::Singleton,
            activator: Activator::Instance(Arc::new(instance)),
            disposer: None,
        })
    }

    /// Returns true if `T` is registered.
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.contains_key(ServiceKey::of::<T>())
    }

    /// Returns true if there is a registration for `key`.
    pub fn contains_key(&self, key: ServiceKey) -> bool {
        self.services.contains_key(&key)
    }

    /// Returns the reuse policy `T` is registered with.
    pub fn reuse_of<T: ?Sized + 'static>(&self) -> Option<Reuse> {
        self.services.get(&ServiceKey::of::<T>()).map(|r| r.reuse)
    }

    /// The number of registrations.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub(crate) fn get(&self, key: ServiceKey) -> Option<&Registration> {
        self.services.get(&key)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.services.keys()
    }
}

fn erase_ctor<T, F>(ctor: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&Resolver) -> Result<T> + Send + Sync + 'static,
{
    Arc::new(move |resolver: &Resolver| {
        let instance: SharedAny = Arc::new(ctor(resolver)?);
        Ok(instance)
    })
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////
