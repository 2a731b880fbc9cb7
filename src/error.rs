//! Errors that can occur while resolving services or using scope values.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type of every fallible operation in this crate.
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Boxed error of a user supplied constructor.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors of the scope context layer.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A singleton value was set or requested for a type that was never
    /// registered as a singleton type with the factory.
    #[error("type {0} not registered as singleton type")]
    NotSingletonType(&'static str),

    /// The runtime type of a supplied value does not match the type it is
    /// stored under.
    #[error("incompatible type and value: expected {0}")]
    IncompatibleValue(&'static str),

    /// There is no registration for the requested type.
    #[error("unable to resolve {0}: no registration found")]
    Unresolved(&'static str),

    /// A service depends on itself, directly or through other services.
    #[error("circular dependency detected: {0}")]
    CircularDependency(String),

    /// A scoped service or singleton type was requested outside of a scope.
    #[error("{0} can only be resolved within a scope")]
    NoCurrentScope(&'static str),

    /// The scope was already disposed.
    #[error("scope has been disposed")]
    ScopeDisposed,

    /// The scope context factory was already disposed.
    #[error("scope context factory has been disposed")]
    FactoryDisposed,

    /// A constructor of a service failed.
    #[error("failed to construct {service}: {source}")]
    Construction {
        service: &'static str,
        #[source]
        source: BoxError,
    },
}

impl ScopeError {
    /// Wraps the error of a custom constructor for service `T`.
    pub fn construction<T: ?Sized, E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        ScopeError::Construction {
            service: std::any::type_name::<T>(),
            source: error.into(),
        }
    }

    /// Returns true if the error is caused by invalid setup of the factory
    /// rather than by a failing constructor or a disposed scope.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ScopeError::NotSingletonType(..)
                | ScopeError::IncompatibleValue(..)
                | ScopeError::Unresolved(..)
                | ScopeError::CircularDependency(..)
                | ScopeError::NoCurrentScope(..)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_names_the_service() {
        let err = ScopeError::construction::<u32, _>("connection refused");
        assert_eq!(err.to_string(), "failed to construct u32: connection refused");
        assert!(err.source().is_some());
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn not_singleton_type_message() {
        let err = ScopeError::NotSingletonType("app::CustomValue");
        assert_eq!(
            err.to_string(),
            "type app::CustomValue not registered as singleton type"
        );
        assert!(err.is_configuration_error());
    }
}
