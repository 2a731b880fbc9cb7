//! Create a scope context factory with the builder pattern.

use crate::container::ScopeContextFactory;
use crate::key::ServiceKey;
use crate::registry::{IfUnresolved, Reuse, ServiceRegistry};
use fnv::FnvHashSet;
use log::warn;
use std::sync::Arc;

/// Configures a [`ScopeContextFactory`].
///
/// The `register_*` methods take `&mut self`, so the builder can be handed to
/// a setup function (see [`create_factory`]). The `with_*` methods are the
/// same operations for chained use.
///
/// [`create_factory`]: crate::create_factory
#[derive(Debug, Default)]
pub struct FactoryBuilder {
    registry: ServiceRegistry,
    singleton_types: FnvHashSet<ServiceKey>,
    if_unresolved: IfUnresolved,
}

impl FactoryBuilder {
    /// Creates a new FactoryBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new FactoryBuilder with the specified capacity for service
    /// registrations.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: ServiceRegistry::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Lets the application bind its services.
    ///
    /// The callback receives the registry and the reuse policy services
    /// normally use, [`Reuse::Scoped`].
    pub fn register_services<F>(&mut self, register: F) -> &mut Self
    where
        F: FnOnce(&mut ServiceRegistry, Reuse),
    {
        register(&mut self.registry, Reuse::Scoped);
        self
    }

    /// Registers `T` as a singleton type.
    ///
    /// Instances of `T` are not constructed by a scope. Instead, the caller
    /// supplies a value per scope with `ScopeContext::set_singleton_value`.
    pub fn register_singleton_type<T: Send + Sync + 'static>(&mut self) -> &mut Self {
        self.register_singleton_key(ServiceKey::of::<T>())
    }

    /// Registers the type identified by `key` as a singleton type.
    pub fn register_singleton_key(&mut self, key: ServiceKey) -> &mut Self {
        self.singleton_types.insert(key);
        self
    }

    /// Sets what happens when an unregistered type is resolved.
    pub fn set_if_unresolved(&mut self, policy: IfUnresolved) -> &mut Self {
        self.if_unresolved = policy;
        self
    }

    /// Lets the application bind its services.
    pub fn with_services<F>(mut self, register: F) -> Self
    where
        F: FnOnce(&mut ServiceRegistry, Reuse),
    {
        self.register_services(register);
        self
    }

    /// Registers `T` as a singleton type.
    pub fn with_singleton_type<T: Send + Sync + 'static>(mut self) -> Self {
        self.register_singleton_type::<T>();
        self
    }

    /// Sets what happens when an unregistered type is resolved.
    pub fn with_if_unresolved(mut self, policy: IfUnresolved) -> Self {
        self.if_unresolved = policy;
        self
    }

    /// Builds the factory.
    pub fn build(self) -> ScopeContextFactory {
        for key in self.registry.keys() {
            if self.singleton_types.contains(key) {
                warn!(
                    "{} is registered as singleton type; its service registration is ignored",
                    key.name()
                );
            }
        }

        ScopeContextFactory::new_built(
            self.registry,
            Arc::new(self.singleton_types),
            self.if_unresolved,
        )
    }
}

///////////////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    struct Value;

    #[test]
    fn new() {
        let builder = FactoryBuilder::new();
        assert!(builder.registry.is_empty());
        assert!(builder.singleton_types.is_empty());
        assert_eq!(builder.if_unresolved, IfUnresolved::ReturnDefault);
    }

    #[test]
    fn with_capacity() {
        let builder = FactoryBuilder::with_capacity(64);
        assert!(builder.registry.is_empty());
    }

    #[test]
    fn register_services_passes_scoped_reuse() {
        let mut builder = FactoryBuilder::new();
        let mut passed = None;
        builder.register_services(|registry, reuse| {
            passed = Some(reuse);
            registry.register_instance(10u8);
        });

        assert_eq!(passed, Some(Reuse::Scoped));
        assert!(builder.registry.is_registered::<u8>());
    }

    #[test]
    fn register_singleton_type() {
        let mut builder = FactoryBuilder::new();
        builder
            .register_singleton_type::<Value>()
            .register_singleton_type::<Value>();

        assert_eq!(builder.singleton_types.len(), 1);
        assert!(builder.singleton_types.contains(&ServiceKey::of::<Value>()));
    }

    #[test]
    fn build() {
        let factory = FactoryBuilder::new()
            .with_singleton_type::<Value>()
            .with_if_unresolved(IfUnresolved::Throw)
            .build();

        assert!(factory.is_singleton_type::<Value>());
        assert_eq!(factory.if_unresolved(), IfUnresolved::Throw);
    }
}
