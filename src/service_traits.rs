//! Traits for creating services.

use crate::error::Result;
use crate::resolver::Resolver;

/// A type that can be constructed and disposed by a scope.
///
/// Register it with [`ServiceRegistry::register`] to make it resolvable.
/// Dependencies are resolved through the supplied resolver; the resolver may
/// also be cloned and kept by the service to look up other services of the
/// same scope later on.
///
/// [`ServiceRegistry::register`]: crate::ServiceRegistry::register
pub trait IService: Send + Sync + Sized + 'static {
    /// Constructs an instance of the service.
    fn construct(resolver: &Resolver) -> Result<Self>;

    /// Called exactly once when the scope (or factory, for singletons) that
    /// constructed the instance is disposed.
    fn dispose(&self) {}
}
